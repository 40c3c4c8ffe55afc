mod args;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use grid_cache::{CacheStore, EtcdCacheStore, MemoryCacheStore};
use grid_proxy::{
    api, AppState, CacheConfig, FleetRefresher, GraphqlDirectory, IdentityCache, LivenessCache,
    Metrics, NodeFetcher, NodeQueries, RefreshConfig, RelayNodeProbe,
};

use crate::args::Args;

fn build_version() -> String {
    match option_env!("GRID_PROXY_GIT_COMMIT") {
        Some(commit) => format!("{}-{}", env!("CARGO_PKG_VERSION"), commit),
        None => env!("CARGO_PKG_VERSION").to_string(),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error=%e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let otel = grid_common::telemetry::init_tracing(
        "grid-proxy",
        &args.log_level,
        args.otlp_endpoint.as_deref(),
        args.otlp_token.as_deref(),
    );

    let store: Arc<dyn CacheStore> = if args.in_memory_cache {
        tracing::warn!("using in-memory liveness cache, state is lost on restart");
        Arc::new(MemoryCacheStore::new())
    } else {
        tracing::info!(endpoint=%args.etcd_endpoint, "connecting to cache store");
        Arc::new(EtcdCacheStore::connect(std::slice::from_ref(&args.etcd_endpoint)).await?)
    };

    let directory = Arc::new(GraphqlDirectory::new(
        args.explorer_url.clone(),
        Duration::from_secs(args.directory_timeout_secs),
    )?);
    let probe = Arc::new(RelayNodeProbe::new(
        &args.relay_url,
        Duration::from_secs(args.probe_timeout_secs),
    )?);

    let cache_config = CacheConfig {
        store_timeout: Duration::from_millis(args.cache_timeout_ms.max(1)),
        ..Default::default()
    };
    let identity = Arc::new(IdentityCache::new(
        cache_config.twin_ttl,
        cache_config.twin_purge_after,
    ));
    let liveness = LivenessCache::new(store, &cache_config);
    let fetcher = Arc::new(NodeFetcher::new(
        directory.clone(),
        probe,
        identity.clone(),
        liveness,
    ));

    let metrics = Arc::new(Metrics::default());
    let refresher = Arc::new(FleetRefresher::new(
        directory.clone(),
        fetcher.clone(),
        identity,
        metrics.clone(),
        RefreshConfig {
            interval: Duration::from_secs(args.refresh_interval_secs.max(1)),
            concurrency: args.refresh_concurrency,
        },
    ));
    let refresh_task = tokio::spawn(refresher.clone().run());

    let st = AppState {
        queries: Arc::new(NodeQueries::new(directory, fetcher, refresher)),
        metrics,
        version: build_version(),
    };

    tracing::info!(
        listen_addr=%args.listen_addr,
        explorer=%args.explorer_url,
        relay=%args.relay_url,
        "grid-proxy starting"
    );
    let listener = tokio::net::TcpListener::bind(&args.listen_addr).await?;
    let served = axum::serve(listener, api::router(st))
        .with_graceful_shutdown(shutdown_signal())
        .await;

    refresh_task.abort();
    if let Some(provider) = otel {
        if let Err(e) = provider.shutdown() {
            eprintln!("failed to flush traces: {e}");
        }
    }
    served?;
    Ok(())
}
