use serde::{Deserialize, Serialize};

use crate::NodeSnapshot;

/// Value stored under a node's liveness key.
///
/// A likely-down marker keeps the last good snapshot so listings can still show
/// the node's last-known capacity while it is unreachable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CacheEntry {
    Up { snapshot: NodeSnapshot },
    LikelyDown { snapshot: NodeSnapshot },
}

impl CacheEntry {
    pub fn snapshot(&self) -> &NodeSnapshot {
        match self {
            CacheEntry::Up { snapshot } | CacheEntry::LikelyDown { snapshot } => snapshot,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum LivenessState {
    #[serde(rename = "up")]
    Up,
    #[serde(rename = "likely down")]
    LikelyDown,
    #[serde(rename = "down")]
    Down,
}

impl LivenessState {
    /// The only place liveness is derived from cache contents.
    pub fn classify(entry: Option<&CacheEntry>) -> Self {
        match entry {
            Some(CacheEntry::Up { .. }) => LivenessState::Up,
            Some(CacheEntry::LikelyDown { .. }) => LivenessState::LikelyDown,
            None => LivenessState::Down,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LivenessState::Up => "up",
            LivenessState::LikelyDown => "likely down",
            LivenessState::Down => "down",
        }
    }
}

impl std::fmt::Display for LivenessState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeStatusResponse {
    pub status: LivenessState,
}
