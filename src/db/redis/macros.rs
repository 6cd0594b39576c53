/// Read-through caching over a [`crate::db::Cache`].
///
/// Returns the cached value for `$key` when present; otherwise runs `$block`
/// to compute it, queues a background write with the given TTL, and returns
/// the computed value. `$block` must evaluate to an `AppResult` of a
/// serde-serializable type.
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        if let Some(cached) = $cache.get_from_cache(&$key).await? {
            Ok(cached)
        } else {
            let value = $block.await?;
            $cache.set_in_background(&$key, &value, $ttl);
            Ok(value)
        }
    }};
}
