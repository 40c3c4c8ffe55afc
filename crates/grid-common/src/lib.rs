pub mod capacity;
pub mod directory;
pub mod liveness;
pub mod snapshot;

pub use capacity::{round_total_memory, Capacity, CapacityResult, GIGABYTE};
pub use directory::{Farm, FarmPublicIp, Node, NodeListItem, PublicConfig};
pub use liveness::{CacheEntry, LivenessState, NodeStatusResponse};
pub use snapshot::{Dmi, DmiProperty, DmiSection, DmiSubSection, DmiTooling, NodeSnapshot, NodeVersion};

pub mod telemetry;
