pub mod cache;
pub mod macros;

pub use cache::Cache;
pub use cache::CacheKey;
