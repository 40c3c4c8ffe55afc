use std::sync::Arc;

use crate::metrics::Metrics;
use crate::query::NodeQueries;

#[derive(Clone)]
pub struct AppState {
    pub queries: Arc<NodeQueries>,
    pub metrics: Arc<Metrics>,
    pub version: String,
}
