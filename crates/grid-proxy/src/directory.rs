use std::time::Duration;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use grid_common::{Farm, Node};

use crate::error::DirectoryError;

/// Read-only index of nodes and farms.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Twin id of a node; `NotFound` when the index has no such node.
    async fn twin_id(&self, node_id: u32) -> Result<u32, DirectoryError>;

    /// Every node id known to the index.
    async fn node_ids(&self) -> Result<Vec<u32>, DirectoryError>;

    async fn nodes(&self, filter: &NodeFilter) -> Result<Vec<Node>, DirectoryError>;

    async fn farms(&self, limit: u32, offset: u32) -> Result<Vec<Farm>, DirectoryError>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeFilter {
    pub limit: u32,
    pub offset: u32,
    pub farm_id: Option<u32>,
    /// Only nodes with a public domain configured.
    pub gateways_only: bool,
}

const NODE_FIELDS: &str = r#"
    version
    id
    nodeId
    farmId
    twinId
    country
    gridVersion
    city
    uptime
    created
    farmingPolicyId
    updatedAt
    cru
    mru
    sru
    hru
    certificationType
    publicConfig {
      domain
      gw4
      gw6
      ipv4
      ipv6
    }"#;

const FARM_FIELDS: &str = r#"
    name
    farmId
    twinId
    version
    pricingPolicyId
    stellarAddress
    publicIPs {
      id
      ip
      contractId
      gateway
    }"#;

fn twin_query(node_id: u32) -> String {
    format!("{{ nodes(where: {{nodeId_eq: {node_id}}}) {{ twinId }} }}")
}

fn node_ids_query() -> String {
    "{ nodes(limit: 99999999) { nodeId } }".to_string()
}

fn nodes_query(filter: &NodeFilter) -> String {
    let mut conditions = Vec::new();
    if let Some(farm_id) = filter.farm_id {
        conditions.push(format!("farmId_eq: {farm_id}"));
    }
    if filter.gateways_only {
        conditions.push(r#"publicConfig_json: {domain_contains: "."}"#.to_string());
    }
    format!(
        "{{ nodes(limit: {}, offset: {}, where: {{{}}}) {{{NODE_FIELDS}\n}} }}",
        filter.limit,
        filter.offset,
        conditions.join(", ")
    )
}

fn farms_query(limit: u32, offset: u32) -> String {
    format!("{{ farms(limit: {limit}, offset: {offset}) {{{FARM_FIELDS}\n}} }}")
}

#[derive(Serialize)]
struct GraphqlRequest<'a> {
    query: &'a str,
}

#[derive(Deserialize)]
struct GraphqlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphqlError>,
}

#[derive(Deserialize)]
struct GraphqlError {
    message: String,
}

#[derive(Deserialize)]
struct NodesData<T> {
    nodes: Vec<T>,
}

#[derive(Deserialize)]
struct FarmsData {
    farms: Vec<Farm>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TwinRow {
    twin_id: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NodeIdRow {
    node_id: u32,
}

/// Directory backed by the grid's GraphQL indexer.
#[derive(Clone)]
pub struct GraphqlDirectory {
    url: String,
    http: reqwest::Client,
}

impl GraphqlDirectory {
    pub fn new(url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(3).min(timeout))
            .timeout(timeout)
            .build()
            .context("failed to build directory http client")?;
        Ok(Self {
            url: url.into(),
            http,
        })
    }

    async fn query<T: DeserializeOwned>(&self, query: &str) -> anyhow::Result<T> {
        let resp = self
            .http
            .post(&self.url)
            .json(&GraphqlRequest { query })
            .send()
            .await
            .context("failed to reach directory")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow!("directory returned {status}: {body}"));
        }

        let parsed: GraphqlResponse<T> = resp
            .json()
            .await
            .context("failed to decode directory response")?;
        if let Some(err) = parsed.errors.first() {
            return Err(anyhow!("directory query error: {}", err.message));
        }
        parsed
            .data
            .ok_or_else(|| anyhow!("directory response has no data"))
    }
}

#[async_trait]
impl Directory for GraphqlDirectory {
    async fn twin_id(&self, node_id: u32) -> Result<u32, DirectoryError> {
        let data: NodesData<TwinRow> = self
            .query(&twin_query(node_id))
            .await
            .map_err(DirectoryError::Query)?;
        data.nodes
            .first()
            .map(|row| row.twin_id)
            .ok_or(DirectoryError::NotFound)
    }

    async fn node_ids(&self) -> Result<Vec<u32>, DirectoryError> {
        let data: NodesData<NodeIdRow> = self
            .query(&node_ids_query())
            .await
            .map_err(DirectoryError::Query)?;
        Ok(data.nodes.into_iter().map(|row| row.node_id).collect())
    }

    async fn nodes(&self, filter: &NodeFilter) -> Result<Vec<Node>, DirectoryError> {
        let data: NodesData<Node> = self
            .query(&nodes_query(filter))
            .await
            .map_err(DirectoryError::Query)?;
        Ok(data.nodes)
    }

    async fn farms(&self, limit: u32, offset: u32) -> Result<Vec<Farm>, DirectoryError> {
        let data: FarmsData = self
            .query(&farms_query(limit, offset))
            .await
            .map_err(DirectoryError::Query)?;
        Ok(data.farms)
    }
}
