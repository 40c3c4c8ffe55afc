use thiserror::Error;

#[derive(Debug, Error)]
pub enum DirectoryError {
    /// The directory answered and has no such record. Never retried.
    #[error("not found in directory")]
    NotFound,
    #[error("directory query failed: {0:#}")]
    Query(anyhow::Error),
}

/// Outcome of a single live fetch attempt.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("node {0} not found")]
    NotFound(u32),
    /// Any transport, timeout or protocol failure while talking to the
    /// directory or the node.
    #[error("node {node_id} unreachable while fetching {stage}: {error:#}")]
    Unreachable {
        node_id: u32,
        stage: &'static str,
        error: anyhow::Error,
    },
}

/// Outcome of a cache-aware node read, as seen by the read path.
#[derive(Debug, Error)]
pub enum NodeDataError {
    #[error("node {0} not found")]
    NotFound(u32),
    #[error("node {node_id} is likely down: {reason}")]
    LikelyDown { node_id: u32, reason: String },
    #[error("bad gateway for node {node_id}: {reason}")]
    BadGateway { node_id: u32, reason: String },
    #[error("internal error: {0:#}")]
    Internal(anyhow::Error),
}
