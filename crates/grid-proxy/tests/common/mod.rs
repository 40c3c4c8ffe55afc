#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;

use grid_cache::{CacheStore, MemoryCacheStore};
use grid_common::{Capacity, CapacityResult, Dmi, DmiSection, Farm, Node, NodeVersion, PublicConfig};
use grid_proxy::{
    AppState, CacheConfig, Directory, DirectoryError, FleetRefresher, IdentityCache,
    LivenessCache, Metrics, NodeFetcher, NodeFilter, NodeProbe, NodeQueries, RefreshConfig,
};

#[derive(Default)]
pub struct FakeDirectory {
    nodes: Mutex<BTreeMap<u32, Node>>,
    farms: Mutex<Vec<Farm>>,
    pub fail: AtomicBool,
    pub twin_calls: AtomicUsize,
    pub node_ids_calls: AtomicUsize,
    pub last_filter: Mutex<Option<NodeFilter>>,
}

impl FakeDirectory {
    pub fn add_node(&self, node_id: u32, twin_id: u32, farm_id: u32) {
        self.insert(Node {
            id: format!("node-{node_id}"),
            node_id,
            twin_id,
            farm_id,
            country: "Belgium".into(),
            city: "Ghent".into(),
            ..Default::default()
        });
    }

    pub fn add_gateway(&self, node_id: u32, twin_id: u32, farm_id: u32) {
        self.insert(Node {
            id: format!("node-{node_id}"),
            node_id,
            twin_id,
            farm_id,
            public_config: Some(PublicConfig {
                domain: format!("gw{node_id}.grid.tf"),
                ..Default::default()
            }),
            ..Default::default()
        });
    }

    pub fn insert(&self, node: Node) {
        self.nodes.lock().unwrap().insert(node.node_id, node);
    }

    pub fn remove_node(&self, node_id: u32) {
        self.nodes.lock().unwrap().remove(&node_id);
    }

    pub fn add_farm(&self, farm_id: u32, name: &str) {
        self.farms.lock().unwrap().push(Farm {
            farm_id,
            name: name.to_string(),
            ..Default::default()
        });
    }

    fn check(&self) -> Result<(), DirectoryError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(DirectoryError::Query(anyhow!("directory offline")));
        }
        Ok(())
    }
}

#[async_trait]
impl Directory for FakeDirectory {
    async fn twin_id(&self, node_id: u32) -> Result<u32, DirectoryError> {
        self.twin_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.nodes
            .lock()
            .unwrap()
            .get(&node_id)
            .map(|n| n.twin_id)
            .ok_or(DirectoryError::NotFound)
    }

    async fn node_ids(&self) -> Result<Vec<u32>, DirectoryError> {
        self.node_ids_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self.nodes.lock().unwrap().keys().copied().collect())
    }

    async fn nodes(&self, filter: &NodeFilter) -> Result<Vec<Node>, DirectoryError> {
        self.check()?;
        *self.last_filter.lock().unwrap() = Some(filter.clone());
        Ok(self
            .nodes
            .lock()
            .unwrap()
            .values()
            .filter(|n| filter.farm_id.map_or(true, |f| n.farm_id == f))
            .filter(|n| {
                !filter.gateways_only
                    || n.public_config.as_ref().is_some_and(|c| c.domain.contains('.'))
            })
            .skip(filter.offset as usize)
            .take(filter.limit as usize)
            .cloned()
            .collect())
    }

    async fn farms(&self, limit: u32, offset: u32) -> Result<Vec<Farm>, DirectoryError> {
        self.check()?;
        Ok(self
            .farms
            .lock()
            .unwrap()
            .iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

/// Node probe keyed by twin id, with call counters and in-flight tracking.
#[derive(Default)]
pub struct FakeProbe {
    capacities: Mutex<HashMap<u32, CapacityResult>>,
    down: Mutex<HashSet<u32>>,
    delay: Duration,
    pub counter_calls: AtomicUsize,
    pub hypervisor_calls: AtomicUsize,
    pub dmi_calls: AtomicUsize,
    inflight: AtomicUsize,
    high_water: AtomicUsize,
}

impl FakeProbe {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Default::default()
        }
    }

    pub fn set_capacity(&self, twin_id: u32, total_cru: u64, used_cru: u64) {
        self.capacities.lock().unwrap().insert(
            twin_id,
            CapacityResult {
                total: Capacity {
                    cru: total_cru,
                    ..Default::default()
                },
                used: Capacity {
                    cru: used_cru,
                    ..Default::default()
                },
            },
        );
    }

    pub fn set_down(&self, twin_id: u32, down: bool) {
        let mut guard = self.down.lock().unwrap();
        if down {
            guard.insert(twin_id);
        } else {
            guard.remove(&twin_id);
        }
    }

    pub fn calls(&self) -> usize {
        self.counter_calls.load(Ordering::SeqCst)
    }

    pub fn inflight(&self) -> usize {
        self.inflight.load(Ordering::SeqCst)
    }

    pub fn high_water(&self) -> usize {
        self.high_water.load(Ordering::SeqCst)
    }

    fn reachable(&self, twin_id: u32) -> anyhow::Result<()> {
        if self.down.lock().unwrap().contains(&twin_id) {
            return Err(anyhow!("request to twin {twin_id} timed out"));
        }
        Ok(())
    }
}

#[async_trait]
impl NodeProbe for FakeProbe {
    async fn counters(&self, twin_id: u32) -> anyhow::Result<CapacityResult> {
        self.counter_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.inflight.fetch_add(1, Ordering::SeqCst) + 1;
        self.high_water.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.inflight.fetch_sub(1, Ordering::SeqCst);

        self.reachable(twin_id)?;
        Ok(self
            .capacities
            .lock()
            .unwrap()
            .get(&twin_id)
            .copied()
            .unwrap_or_default())
    }

    async fn version(&self, twin_id: u32) -> anyhow::Result<NodeVersion> {
        self.reachable(twin_id)?;
        Ok(NodeVersion {
            zos: "3.4.0".into(),
            zinit: "0.2.11".into(),
        })
    }

    async fn hypervisor(&self, twin_id: u32) -> anyhow::Result<String> {
        self.hypervisor_calls.fetch_add(1, Ordering::SeqCst);
        self.reachable(twin_id)?;
        Ok("kvm".into())
    }

    async fn dmi(&self, twin_id: u32) -> anyhow::Result<Dmi> {
        self.dmi_calls.fetch_add(1, Ordering::SeqCst);
        self.reachable(twin_id)?;
        Ok(Dmi {
            sections: vec![DmiSection {
                typestr: "BIOS Information".into(),
                typenum: 0,
                ..Default::default()
            }],
            ..Default::default()
        })
    }
}

pub struct Harness {
    pub store: Arc<dyn CacheStore>,
    pub directory: Arc<FakeDirectory>,
    pub probe: Arc<FakeProbe>,
    pub identity: Arc<IdentityCache>,
    pub liveness: LivenessCache,
    pub fetcher: Arc<NodeFetcher>,
    pub refresher: Arc<FleetRefresher>,
    pub queries: Arc<NodeQueries>,
    pub metrics: Arc<Metrics>,
}

impl Harness {
    pub fn new() -> Self {
        Self::build(
            Arc::new(MemoryCacheStore::new()),
            FakeProbe::default(),
            RefreshConfig::default(),
        )
    }

    pub fn build(store: Arc<dyn CacheStore>, probe: FakeProbe, refresh: RefreshConfig) -> Self {
        let cache_config = CacheConfig::default();
        let directory = Arc::new(FakeDirectory::default());
        let probe = Arc::new(probe);
        let identity = Arc::new(IdentityCache::new(
            cache_config.twin_ttl,
            cache_config.twin_purge_after,
        ));
        let liveness = LivenessCache::new(store.clone(), &cache_config);
        let fetcher = Arc::new(NodeFetcher::new(
            directory.clone(),
            probe.clone(),
            identity.clone(),
            liveness.clone(),
        ));
        let metrics = Arc::new(Metrics::default());
        let refresher = Arc::new(FleetRefresher::new(
            directory.clone(),
            fetcher.clone(),
            identity.clone(),
            metrics.clone(),
            refresh,
        ));
        let queries = Arc::new(NodeQueries::new(
            directory.clone(),
            fetcher.clone(),
            refresher.clone(),
        ));
        Self {
            store,
            directory,
            probe,
            identity,
            liveness,
            fetcher,
            refresher,
            queries,
            metrics,
        }
    }

    pub fn state(&self) -> AppState {
        AppState {
            queries: self.queries.clone(),
            metrics: self.metrics.clone(),
            version: "test".to_string(),
        }
    }

    /// Node 42 on twin 7 reporting 4 cores with 1 in use.
    pub fn with_node_42(self) -> Self {
        self.directory.add_node(42, 7, 1);
        self.probe.set_capacity(7, 4, 1);
        self
    }
}
