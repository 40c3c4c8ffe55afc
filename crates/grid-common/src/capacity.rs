use serde::{Deserialize, Serialize};

pub const GIGABYTE: u64 = 1024 * 1024 * 1024;

/// Resource units reported by a node. Storage and memory are in bytes.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Capacity {
    #[serde(default)]
    pub cru: u64,
    #[serde(default)]
    pub sru: u64,
    #[serde(default)]
    pub hru: u64,
    #[serde(default)]
    pub mru: u64,
    #[serde(default)]
    pub ipv4u: u64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CapacityResult {
    #[serde(rename = "total_resources")]
    pub total: Capacity,
    #[serde(rename = "used_resources")]
    pub used: Capacity,
}

/// Floors total memory to a whole gigabyte; nodes report slightly less than
/// their installed memory and listings show the rounded figure.
pub fn round_total_memory(cap: &Capacity) -> Capacity {
    Capacity {
        mru: (cap.mru / GIGABYTE) * GIGABYTE,
        ..*cap
    }
}
