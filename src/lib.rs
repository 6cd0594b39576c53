pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod ranking;
pub mod routes;
pub mod services;
pub mod store;
