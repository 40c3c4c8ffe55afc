use clap::Parser;

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Args {
    #[arg(long, env = "GRID_PROXY_ADDR", default_value = "0.0.0.0:8080")]
    pub listen_addr: String,

    /// GraphQL endpoint of the grid indexer.
    #[arg(long, env = "GRID_EXPLORER_URL", default_value = "https://graphql.grid.tf/graphql")]
    pub explorer_url: String,

    /// Message relay used to reach nodes by twin id.
    #[arg(long, env = "GRID_RELAY_URL", default_value = "http://127.0.0.1:8051")]
    pub relay_url: String,

    #[arg(long, env = "ETCD_ENDPOINT", default_value = "http://127.0.0.1:2379")]
    pub etcd_endpoint: String,

    /// Upper bound on each cache store call; a slower call counts as a miss.
    #[arg(long, default_value_t = 2000)]
    pub cache_timeout_ms: u64,

    /// Keep the liveness cache in process memory instead of etcd.
    #[arg(long, default_value_t = false)]
    pub in_memory_cache: bool,

    /// Log filter used when RUST_LOG is not set.
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// OTLP/HTTP base URL for trace export. Disabled when unset.
    #[arg(long, env = "OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,

    #[arg(long, env = "OTLP_TOKEN")]
    pub otlp_token: Option<String>,

    #[arg(long, default_value_t = 120)]
    pub refresh_interval_secs: u64,

    #[arg(long, default_value_t = 30)]
    pub refresh_concurrency: usize,

    #[arg(long, default_value_t = 10)]
    pub directory_timeout_secs: u64,

    #[arg(long, default_value_t = 10)]
    pub probe_timeout_secs: u64,
}
