use serde::{Deserialize, Deserializer, Serialize};

use crate::{round_total_memory, CapacityResult, LivenessState, NodeSnapshot};

/// Node record as indexed by the directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub id: String,
    pub node_id: u32,
    #[serde(default)]
    pub farm_id: u32,
    #[serde(default)]
    pub twin_id: u32,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub grid_version: u32,
    #[serde(default)]
    pub city: String,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub uptime: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub created: u64,
    #[serde(default)]
    pub farming_policy_id: u32,
    #[serde(default, deserialize_with = "lenient_string")]
    pub updated_at: String,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub cru: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub mru: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub sru: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub hru: u64,
    #[serde(default)]
    pub certification_type: String,
    #[serde(default)]
    pub public_config: Option<PublicConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PublicConfig {
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub gw4: String,
    #[serde(default)]
    pub gw6: String,
    #[serde(default)]
    pub ipv4: String,
    #[serde(default)]
    pub ipv6: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Farm {
    #[serde(default)]
    pub name: String,
    pub farm_id: u32,
    #[serde(default)]
    pub twin_id: u32,
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub pricing_policy_id: u32,
    #[serde(default)]
    pub stellar_address: Option<String>,
    #[serde(default, rename = "publicIPs")]
    pub public_ips: Vec<FarmPublicIp>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FarmPublicIp {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub ip: String,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub contract_id: u64,
    #[serde(default)]
    pub gateway: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Location {
    pub country: String,
    pub city: String,
}

/// One row of the `/nodes` listing: directory identity plus cached liveness.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NodeListItem {
    pub version: u32,
    pub id: String,
    pub node_id: u32,
    pub farm_id: u32,
    pub twin_id: u32,
    pub country: String,
    pub grid_version: u32,
    pub city: String,
    pub uptime: u64,
    pub created: u64,
    pub farming_policy_id: u32,
    pub updated_at: String,
    pub location: Location,
    pub public_config: Option<PublicConfig>,
    pub status: LivenessState,
    pub certification_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity: Option<CapacityResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hypervisor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zos_version: Option<String>,
}

impl NodeListItem {
    pub fn new(node: Node, status: LivenessState, cached: Option<&NodeSnapshot>) -> Self {
        let capacity = cached.map(|s| CapacityResult {
            total: round_total_memory(&s.capacity.total),
            used: s.capacity.used,
        });
        Self {
            version: node.version,
            id: node.id,
            node_id: node.node_id,
            farm_id: node.farm_id,
            twin_id: node.twin_id,
            location: Location {
                country: node.country.clone(),
                city: node.city.clone(),
            },
            country: node.country,
            grid_version: node.grid_version,
            city: node.city,
            uptime: node.uptime,
            created: node.created,
            farming_policy_id: node.farming_policy_id,
            updated_at: node.updated_at,
            public_config: node.public_config,
            status,
            certification_type: node.certification_type,
            capacity,
            hypervisor: cached.map(|s| s.hypervisor.clone()),
            zos_version: cached.map(|s| s.zos_version.clone()),
        }
    }
}

// The indexer encodes big integers as strings and timestamps as either.
#[derive(Deserialize)]
#[serde(untagged)]
enum NumOrString {
    Num(u64),
    Str(String),
}

fn lenient_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<NumOrString>::deserialize(deserializer)? {
        None => Ok(0),
        Some(NumOrString::Num(n)) => Ok(n),
        Some(NumOrString::Str(s)) if s.is_empty() => Ok(0),
        Some(NumOrString::Str(s)) => s.parse().map_err(serde::de::Error::custom),
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<NumOrString>::deserialize(deserializer)? {
        None => Ok(String::new()),
        Some(NumOrString::Num(n)) => Ok(n.to_string()),
        Some(NumOrString::Str(s)) => Ok(s),
    }
}
