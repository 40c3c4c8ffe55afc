use std::sync::Arc;

use grid_common::{CacheEntry, Dmi, NodeSnapshot};

use crate::directory::Directory;
use crate::error::{DirectoryError, FetchError, NodeDataError};
use crate::identity::IdentityCache;
use crate::liveness::LivenessCache;
use crate::probe::NodeProbe;

/// Per-node fetch pipeline: twin resolution, live probe, snapshot assembly,
/// and the cache update policy around it.
pub struct NodeFetcher {
    directory: Arc<dyn Directory>,
    probe: Arc<dyn NodeProbe>,
    identity: Arc<IdentityCache>,
    liveness: LivenessCache,
}

impl NodeFetcher {
    pub fn new(
        directory: Arc<dyn Directory>,
        probe: Arc<dyn NodeProbe>,
        identity: Arc<IdentityCache>,
        liveness: LivenessCache,
    ) -> Self {
        Self {
            directory,
            probe,
            identity,
            liveness,
        }
    }

    pub fn liveness(&self) -> &LivenessCache {
        &self.liveness
    }

    /// Probe the node now, bypassing the liveness cache.
    pub async fn fetch_live(&self, node_id: u32) -> Result<NodeSnapshot, FetchError> {
        let unreachable = |stage: &'static str| {
            move |error: anyhow::Error| FetchError::Unreachable {
                node_id,
                stage,
                error,
            }
        };

        let twin_id = match self
            .identity
            .resolve_twin(self.directory.as_ref(), node_id)
            .await
        {
            Ok(t) => t,
            Err(DirectoryError::NotFound) => return Err(FetchError::NotFound(node_id)),
            Err(DirectoryError::Query(e)) => return Err(unreachable("resolve twin")(e)),
        };

        let capacity = self
            .probe
            .counters(twin_id)
            .await
            .map_err(unreachable("statistics"))?;
        let version = self
            .probe
            .version(twin_id)
            .await
            .map_err(unreachable("version"))?;
        let hypervisor = self
            .hypervisor(node_id, twin_id)
            .await
            .map_err(unreachable("hypervisor"))?;
        let dmi = self
            .dmi(node_id, twin_id)
            .await
            .map_err(unreachable("dmi"))?;

        Ok(NodeSnapshot {
            capacity,
            dmi,
            hypervisor,
            zos_version: version.zos,
        })
    }

    async fn hypervisor(&self, node_id: u32, twin_id: u32) -> anyhow::Result<String> {
        if let Some(h) = self.identity.hypervisor(node_id) {
            return Ok(h);
        }
        let h = self.probe.hypervisor(twin_id).await?;
        self.identity.put_hypervisor(node_id, h.clone());
        Ok(h)
    }

    async fn dmi(&self, node_id: u32, twin_id: u32) -> anyhow::Result<Dmi> {
        if let Some(d) = self.identity.dmi(node_id) {
            return Ok(d);
        }
        let d = self.probe.dmi(twin_id).await?;
        self.identity.put_dmi(node_id, d.clone());
        Ok(d)
    }

    /// Serialized snapshot for `node_id`.
    ///
    /// Without `force`, a cached entry answers the call and no probe is made.
    /// Otherwise the node is probed and the cache updated:
    /// - directory says the node is gone: entry deleted, `NotFound`
    /// - probe failed after a fresh snapshot: entry turned into a likely-down
    ///   marker carrying that snapshot, `LikelyDown`
    /// - probe failed with a marker already present: marker left to expire,
    ///   `LikelyDown`
    /// - probe failed with nothing cached: `BadGateway`
    /// - probe succeeded: fresh entry written, snapshot returned
    pub async fn get_node_data(&self, node_id: u32, force: bool) -> Result<String, NodeDataError> {
        let cached = self.liveness.lookup(node_id).await;

        if !force {
            match &cached {
                Some(CacheEntry::Up { snapshot }) => return encode(snapshot),
                Some(CacheEntry::LikelyDown { .. }) => {
                    return Err(NodeDataError::LikelyDown {
                        node_id,
                        reason: "node did not answer its last probe".to_string(),
                    })
                }
                None => {}
            }
        }

        match self.fetch_live(node_id).await {
            Ok(snapshot) => {
                let payload = encode(&snapshot)?;
                self.liveness.store_fresh(node_id, snapshot).await;
                Ok(payload)
            }
            Err(FetchError::NotFound(_)) => {
                self.liveness.clear(node_id).await;
                Err(NodeDataError::NotFound(node_id))
            }
            Err(err) => {
                let reason = err.to_string();
                match cached {
                    Some(CacheEntry::Up { snapshot }) => {
                        self.liveness.mark_likely_down(node_id, snapshot).await;
                        Err(NodeDataError::LikelyDown { node_id, reason })
                    }
                    Some(CacheEntry::LikelyDown { .. }) => {
                        Err(NodeDataError::LikelyDown { node_id, reason })
                    }
                    None => {
                        self.liveness.clear(node_id).await;
                        Err(NodeDataError::BadGateway { node_id, reason })
                    }
                }
            }
        }
    }
}

fn encode(snapshot: &NodeSnapshot) -> Result<String, NodeDataError> {
    snapshot
        .to_json()
        .map_err(|e| NodeDataError::Internal(anyhow::Error::new(e).context("encode snapshot")))
}
