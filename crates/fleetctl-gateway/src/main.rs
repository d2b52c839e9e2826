use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use fleetctl_core::FleetctlConfig;
use fleetctl_memory::{NoopEmbedder, NoopSummariser, SealPipeline, SealRunner, SqlLtmStore};
use fleetctl_store::DurableStore;
use tracing::info;

mod app;
mod http;

const DEFAULT_WEBHOOK_RATE_LIMIT: u32 = 60;
const DEFAULT_SEAL_INTERVAL_SECS: u64 = 60;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fleetctl_gateway=info,tower_http=debug".into()),
        )
        .init();

    let config_path = std::env::var("FLEETCTL_CONFIG").ok();
    let config = FleetctlConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        tracing::warn!("config load failed ({e}), using defaults");
        FleetctlConfig::default()
    });

    let store = Arc::new(DurableStore::open(&config.database_path)?);
    let state = Arc::new(app::AppState::new(store.clone(), DEFAULT_WEBHOOK_RATE_LIMIT));

    // Seal pipeline runs with noop summariser/embedder until the host wires
    // in a real LLM provider and embedding model — the pipeline must run to
    // completion with either.
    let ltm = Arc::new(SqlLtmStore::open(&config.database_path)?);
    let pipeline = Arc::new(SealPipeline::new(
        Arc::new(NoopSummariser),
        Arc::new(NoopEmbedder { dims: 1 }),
        ltm,
    ));
    let tracker = Arc::new(fleetctl_memory::ConversationTracker::new(
        fleetctl_memory::TrackerConfig::default(),
    ));
    let seal_runner = Arc::new(SealRunner::new(
        tracker,
        pipeline,
        Duration::from_secs(DEFAULT_SEAL_INTERVAL_SECS),
    ));
    tokio::spawn({
        let runner = seal_runner.clone();
        async move { runner.run().await }
    });

    let router = app::build_router(state);

    let addr: SocketAddr = "0.0.0.0:8088".parse()?;
    info!("fleetctl gateway listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
