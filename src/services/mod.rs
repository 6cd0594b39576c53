pub mod providers;
pub mod rankings;
