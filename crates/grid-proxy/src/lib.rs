pub mod api;
pub mod config;
pub mod directory;
pub mod error;
pub mod fetch;
pub mod identity;
pub mod liveness;
pub mod metrics;
pub mod probe;
pub mod query;
pub mod refresher;
pub mod state;

pub use config::{CacheConfig, RefreshConfig};
pub use directory::{Directory, GraphqlDirectory, NodeFilter};
pub use error::{DirectoryError, FetchError, NodeDataError};
pub use fetch::NodeFetcher;
pub use identity::IdentityCache;
pub use liveness::LivenessCache;
pub use metrics::Metrics;
pub use probe::{NodeProbe, RelayNodeProbe};
pub use query::{ListParams, NodeQueries, RawListQuery};
pub use refresher::{CycleReport, FleetRefresher};
pub use state::AppState;
