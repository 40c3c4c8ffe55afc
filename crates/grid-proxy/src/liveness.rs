use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use grid_cache::CacheStore;
use grid_common::{CacheEntry, LivenessState, NodeSnapshot};

use crate::config::CacheConfig;

/// Per-node liveness records on top of the durable cache store.
///
/// Store failures never surface: a failed or timed-out read is a miss, a
/// failed write or delete is logged and dropped.
#[derive(Clone)]
pub struct LivenessCache {
    store: Arc<dyn CacheStore>,
    fresh_ttl_secs: u64,
    likely_down_ttl_secs: u64,
    op_timeout: Duration,
}

impl LivenessCache {
    pub fn new(store: Arc<dyn CacheStore>, config: &CacheConfig) -> Self {
        Self {
            store,
            fresh_ttl_secs: config.fresh_ttl_secs,
            likely_down_ttl_secs: config.likely_down_ttl_secs,
            op_timeout: config.store_timeout,
        }
    }

    async fn bounded<T>(&self, op: impl Future<Output = anyhow::Result<T>>) -> anyhow::Result<T> {
        match tokio::time::timeout(self.op_timeout, op).await {
            Ok(res) => res,
            Err(_) => Err(anyhow!("cache store timed out after {:?}", self.op_timeout)),
        }
    }

    pub fn key(node_id: u32) -> String {
        format!("GRID3NODE:{node_id}")
    }

    pub async fn lookup(&self, node_id: u32) -> Option<CacheEntry> {
        let key = Self::key(node_id);
        let bytes = match self.bounded(self.store.get(&key)).await {
            Ok(Some(b)) => b,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(node_id, error=%e, "cache read failed, treating as miss");
                return None;
            }
        };
        match serde_json::from_slice::<CacheEntry>(&bytes) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!(node_id, error=%e, "undecodable cache entry, treating as miss");
                None
            }
        }
    }

    pub async fn status(&self, node_id: u32) -> LivenessState {
        LivenessState::classify(self.lookup(node_id).await.as_ref())
    }

    pub async fn store_fresh(&self, node_id: u32, snapshot: NodeSnapshot) {
        let entry = CacheEntry::Up { snapshot };
        self.write(node_id, &entry, self.fresh_ttl_secs).await;
    }

    /// Replace a fresh snapshot with a marker that still carries it.
    pub async fn mark_likely_down(&self, node_id: u32, snapshot: NodeSnapshot) {
        let entry = CacheEntry::LikelyDown { snapshot };
        self.write(node_id, &entry, self.likely_down_ttl_secs).await;
    }

    pub async fn clear(&self, node_id: u32) {
        if let Err(e) = self.bounded(self.store.delete(&Self::key(node_id))).await {
            tracing::warn!(node_id, error=%e, "could not delete cache entry");
        }
    }

    async fn write(&self, node_id: u32, entry: &CacheEntry, ttl_secs: u64) {
        let bytes = match serde_json::to_vec(entry) {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(node_id, error=%e, "could not encode cache entry");
                return;
            }
        };
        let key = Self::key(node_id);
        if let Err(e) = self
            .bounded(self.store.set(&key, bytes, Some(ttl_secs)))
            .await
        {
            tracing::warn!(node_id, error=%e, "could not write cache entry");
        }
    }
}
