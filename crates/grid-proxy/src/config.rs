use std::time::Duration;

/// Liveness and identity cache lifetimes.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Lifetime of a snapshot written after a successful probe.
    pub fresh_ttl_secs: u64,
    /// Lifetime of the marker written when a previously fresh node stops answering.
    pub likely_down_ttl_secs: u64,
    /// A twin id older than this is resolved again from the directory.
    pub twin_ttl: Duration,
    /// Twin ids older than this are dropped from memory.
    pub twin_purge_after: Duration,
    /// Upper bound on a single cache store call.
    pub store_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            fresh_ttl_secs: 30 * 60,
            likely_down_ttl_secs: 10 * 60,
            twin_ttl: Duration::from_secs(10 * 60),
            twin_purge_after: Duration::from_secs(15 * 60),
            store_timeout: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RefreshConfig {
    pub interval: Duration,
    /// Max per-node fetches in flight during a fleet refresh.
    pub concurrency: usize,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2 * 60),
            concurrency: 30,
        }
    }
}
