use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

use grid_common::Dmi;

use crate::directory::Directory;
use crate::error::DirectoryError;

#[derive(Debug, Clone, Copy)]
struct TwinEntry {
    twin_id: u32,
    resolved_at: Instant,
}

/// Process-local node facts: twin ids with a short lifetime, hardware facts
/// for as long as the process runs.
#[derive(Debug)]
pub struct IdentityCache {
    twins: DashMap<u32, TwinEntry>,
    hypervisors: DashMap<u32, String>,
    dmis: DashMap<u32, Dmi>,
    twin_ttl: Duration,
    purge_after: Duration,
}

impl IdentityCache {
    pub fn new(twin_ttl: Duration, purge_after: Duration) -> Self {
        Self {
            twins: DashMap::new(),
            hypervisors: DashMap::new(),
            dmis: DashMap::new(),
            twin_ttl,
            purge_after: purge_after.max(twin_ttl),
        }
    }

    pub fn twin(&self, node_id: u32) -> Option<u32> {
        let entry = self.twins.get(&node_id)?;
        (entry.resolved_at.elapsed() < self.twin_ttl).then_some(entry.twin_id)
    }

    pub fn put_twin(&self, node_id: u32, twin_id: u32) {
        self.twins.insert(
            node_id,
            TwinEntry {
                twin_id,
                resolved_at: Instant::now(),
            },
        );
    }

    /// Cached twin id, or a fresh directory lookup that is then cached.
    pub async fn resolve_twin(
        &self,
        directory: &dyn Directory,
        node_id: u32,
    ) -> Result<u32, DirectoryError> {
        if let Some(twin_id) = self.twin(node_id) {
            return Ok(twin_id);
        }
        let twin_id = directory.twin_id(node_id).await?;
        self.put_twin(node_id, twin_id);
        Ok(twin_id)
    }

    /// Drops twin ids past the purge window. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let before = self.twins.len();
        let purge_after = self.purge_after;
        self.twins
            .retain(|_, e| e.resolved_at.elapsed() < purge_after);
        before.saturating_sub(self.twins.len())
    }

    pub fn hypervisor(&self, node_id: u32) -> Option<String> {
        self.hypervisors.get(&node_id).map(|h| h.clone())
    }

    pub fn put_hypervisor(&self, node_id: u32, hypervisor: String) {
        self.hypervisors.insert(node_id, hypervisor);
    }

    pub fn dmi(&self, node_id: u32) -> Option<Dmi> {
        self.dmis.get(&node_id).map(|d| d.clone())
    }

    pub fn put_dmi(&self, node_id: u32, dmi: Dmi) {
        self.dmis.insert(node_id, dmi);
    }

    pub fn twin_count(&self) -> usize {
        self.twins.len()
    }
}
