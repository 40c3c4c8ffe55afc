use anyhow::Result;
use async_trait::async_trait;

/// Durable key/value store with per-key expiry.
///
/// A `set` replaces the whole value atomically; readers observe either the old
/// or the new value, never a mix.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store `value` under `key`. `ttl_secs = None` keeps it until deleted.
    async fn set(&self, key: &str, value: Vec<u8>, ttl_secs: Option<u64>) -> Result<()>;

    /// Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;
}
