use std::sync::Arc;

use futures_util::future::join_all;
use serde::Deserialize;
use thiserror::Error;

use grid_common::{Farm, LivenessState, NodeListItem};

use crate::directory::{Directory, NodeFilter};
use crate::error::{DirectoryError, NodeDataError};
use crate::fetch::NodeFetcher;
use crate::refresher::{CycleReport, FleetRefresher};

pub const DEFAULT_MAX_RESULT: u32 = 50;

/// Query string as received, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawListQuery {
    pub page: Option<String>,
    pub max_result: Option<String>,
    pub farm_id: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParamError {
    #[error("invalid max_result: {0}")]
    MaxResult(String),
    #[error("invalid page number: {0}")]
    Page(String),
    #[error("invalid farm_id: {0}")]
    FarmId(String),
}

/// Validated paging and filter parameters for listing calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListParams {
    pub max_result: u32,
    pub page: u32,
    pub farm_id: Option<u32>,
    pub gateways_only: bool,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            max_result: DEFAULT_MAX_RESULT,
            page: 1,
            farm_id: None,
            gateways_only: false,
        }
    }
}

fn non_empty(v: &Option<String>) -> Option<&str> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl ListParams {
    pub fn parse(raw: &RawListQuery, gateways_only: bool) -> Result<Self, ParamError> {
        let max_result = match non_empty(&raw.max_result) {
            None => DEFAULT_MAX_RESULT,
            Some(s) => s
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| ParamError::MaxResult(s.to_string()))?,
        };
        let page = match non_empty(&raw.page) {
            None => 1,
            Some(s) => s
                .parse::<u32>()
                .ok()
                .filter(|n| *n >= 1)
                .ok_or_else(|| ParamError::Page(s.to_string()))?,
        };
        let farm_id = match non_empty(&raw.farm_id) {
            None => None,
            Some(s) => Some(
                s.parse::<u32>()
                    .map_err(|_| ParamError::FarmId(s.to_string()))?,
            ),
        };

        let params = Self {
            max_result,
            page,
            farm_id,
            gateways_only,
        };
        if params.checked_offset().is_none() {
            return Err(ParamError::Page(page.to_string()));
        }
        Ok(params)
    }

    fn checked_offset(&self) -> Option<u32> {
        (self.page - 1).checked_mul(self.max_result)
    }

    pub fn offset(&self) -> u32 {
        self.checked_offset().unwrap_or(u32::MAX)
    }

    pub fn node_filter(&self) -> NodeFilter {
        NodeFilter {
            limit: self.max_result,
            offset: self.offset(),
            farm_id: self.farm_id,
            gateways_only: self.gateways_only,
        }
    }
}

/// Read path used by request handlers. Apart from a cold-cache
/// `get_snapshot`, nothing here probes a node.
pub struct NodeQueries {
    directory: Arc<dyn Directory>,
    fetcher: Arc<NodeFetcher>,
    refresher: Arc<FleetRefresher>,
}

impl NodeQueries {
    pub fn new(
        directory: Arc<dyn Directory>,
        fetcher: Arc<NodeFetcher>,
        refresher: Arc<FleetRefresher>,
    ) -> Self {
        Self {
            directory,
            fetcher,
            refresher,
        }
    }

    pub async fn get_snapshot(&self, node_id: u32) -> Result<String, NodeDataError> {
        self.fetcher.get_node_data(node_id, false).await
    }

    pub async fn get_status(&self, node_id: u32) -> LivenessState {
        self.fetcher.liveness().status(node_id).await
    }

    pub async fn list_nodes(&self, params: &ListParams) -> Result<Vec<NodeListItem>, DirectoryError> {
        let nodes = self.directory.nodes(&params.node_filter()).await?;
        let liveness = self.fetcher.liveness();
        let entries = join_all(nodes.iter().map(|n| liveness.lookup(n.node_id))).await;

        Ok(nodes
            .into_iter()
            .zip(entries)
            .map(|(node, entry)| {
                let status = LivenessState::classify(entry.as_ref());
                NodeListItem::new(node, status, entry.as_ref().map(|e| e.snapshot()))
            })
            .collect())
    }

    pub async fn list_farms(&self, params: &ListParams) -> Result<Vec<Farm>, DirectoryError> {
        self.directory
            .farms(params.max_result, params.offset())
            .await
    }

    pub async fn refresh_all(&self) -> Result<CycleReport, DirectoryError> {
        self.refresher.refresh_all().await
    }

    /// `None` when a cycle is already running.
    pub async fn try_refresh_all(&self) -> Option<Result<CycleReport, DirectoryError>> {
        self.refresher.try_refresh_all().await
    }
}
