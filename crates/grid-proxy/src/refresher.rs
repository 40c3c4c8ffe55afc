use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures_util::stream::{FuturesUnordered, StreamExt};
use futures_util::FutureExt;
use serde::Serialize;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinError;
use tokio::time::MissedTickBehavior;

use crate::config::RefreshConfig;
use crate::directory::Directory;
use crate::error::DirectoryError;
use crate::fetch::NodeFetcher;
use crate::identity::IdentityCache;
use crate::metrics::Metrics;

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct CycleReport {
    pub total: usize,
    pub ok: usize,
    pub failed: usize,
    pub elapsed_ms: u64,
    pub finished_at: DateTime<Utc>,
}

impl CycleReport {
    fn tally(&mut self, res: Result<bool, JoinError>) {
        match res {
            Ok(true) => self.ok += 1,
            Ok(false) => self.failed += 1,
            Err(e) => {
                tracing::error!(error=%e, "node fetch task panicked");
                self.failed += 1;
            }
        }
    }
}

/// Background job that re-probes every known node.
pub struct FleetRefresher {
    directory: Arc<dyn Directory>,
    fetcher: Arc<NodeFetcher>,
    identity: Arc<IdentityCache>,
    metrics: Arc<Metrics>,
    config: RefreshConfig,
    cycle_lock: Mutex<()>,
}

impl FleetRefresher {
    pub fn new(
        directory: Arc<dyn Directory>,
        fetcher: Arc<NodeFetcher>,
        identity: Arc<IdentityCache>,
        metrics: Arc<Metrics>,
        config: RefreshConfig,
    ) -> Self {
        Self {
            directory,
            fetcher,
            identity,
            metrics,
            config,
            cycle_lock: Mutex::new(()),
        }
    }

    /// Runs a cycle immediately, then one per interval. Cycles never overlap:
    /// a slow cycle delays the next tick instead of stacking behind it.
    pub async fn run(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = self.refresh_all().await {
                tracing::error!(error=%e, "fleet refresh failed");
            }
            tracing::debug!(
                interval_secs = self.config.interval.as_secs(),
                "next fleet refresh scheduled"
            );
        }
    }

    /// One full cycle, waiting for any cycle already in progress.
    pub async fn refresh_all(&self) -> Result<CycleReport, DirectoryError> {
        let _guard = self.cycle_lock.lock().await;
        self.run_cycle().await
    }

    /// One full cycle, or `None` if another cycle is running right now.
    pub async fn try_refresh_all(&self) -> Option<Result<CycleReport, DirectoryError>> {
        let _guard = self.cycle_lock.try_lock().ok()?;
        Some(self.run_cycle().await)
    }

    async fn run_cycle(&self) -> Result<CycleReport, DirectoryError> {
        let started = Instant::now();

        let purged = self.identity.purge_expired();
        if purged > 0 {
            tracing::debug!(purged, "dropped stale twin ids");
        }

        let node_ids = self.directory.node_ids().await?;
        let total = node_ids.len();
        tracing::info!(total, "fleet refresh started");

        let permits = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let mut tasks = FuturesUnordered::new();
        let mut report = CycleReport {
            total,
            ..Default::default()
        };

        for (i, node_id) in node_ids.into_iter().enumerate() {
            // reap finished fetches so only in-flight handles are held
            while let Some(Some(res)) = tasks.next().now_or_never() {
                report.tally(res);
            }

            let Ok(permit) = permits.clone().acquire_owned().await else {
                break;
            };
            let fetcher = self.fetcher.clone();
            let metrics = self.metrics.clone();
            tasks.push(tokio::spawn(async move {
                let _permit = permit;
                tracing::debug!(node_id, n = i + 1, "fetching node");
                metrics.probe_started();
                let res = fetcher.get_node_data(node_id, true).await;
                metrics.probe_finished();
                match res {
                    Ok(_) => {
                        tracing::debug!(node_id, "node fetched");
                        true
                    }
                    Err(e) => {
                        tracing::warn!(node_id, error=%e, "could not fetch node data");
                        false
                    }
                }
            }));
        }

        while let Some(res) = tasks.next().await {
            report.tally(res);
        }

        report.elapsed_ms = started.elapsed().as_millis() as u64;
        report.finished_at = Utc::now();
        self.metrics.record_cycle(&report);
        tracing::info!(
            total = report.total,
            ok = report.ok,
            failed = report.failed,
            elapsed_ms = report.elapsed_ms,
            "fleet refresh completed"
        );
        Ok(report)
    }
}
