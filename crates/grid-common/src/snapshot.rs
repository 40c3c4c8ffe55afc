use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::CapacityResult;

/// Point-in-time record assembled from a live probe of one node.
///
/// Snapshots are never edited in place: a later probe produces a new one that
/// replaces the cached value wholesale.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeSnapshot {
    pub capacity: CapacityResult,
    #[serde(default)]
    pub dmi: Dmi,
    pub hypervisor: String,
    #[serde(rename = "zosVersion")]
    pub zos_version: String,
}

impl NodeSnapshot {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeVersion {
    pub zos: String,
    #[serde(default)]
    pub zinit: String,
}

/// Hardware inventory as decoded on the node from its DMI tables.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Dmi {
    #[serde(default)]
    pub tooling: DmiTooling,
    #[serde(default)]
    pub sections: Vec<DmiSection>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DmiTooling {
    #[serde(default)]
    pub aggregator: String,
    #[serde(default)]
    pub decoder: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DmiSection {
    #[serde(default)]
    pub handleline: String,
    #[serde(default)]
    pub typestr: String,
    #[serde(default)]
    pub typenum: u8,
    #[serde(default)]
    pub subsections: Vec<DmiSubSection>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DmiSubSection {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub properties: BTreeMap<String, DmiProperty>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DmiProperty {
    #[serde(default)]
    pub value: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<String>,
}
