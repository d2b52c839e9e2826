use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, routing::post, Router};
use fleetctl_limits::RateLimiter;
use fleetctl_store::DurableStore;

/// Shared state handed to every Axum handler as `State<Arc<AppState>>`.
pub struct AppState {
    pub store: Arc<DurableStore>,
    /// Per-agent rate limiter guarding inbound webhook deliveries.
    /// Default 60/min.
    pub webhook_limiter: RateLimiter,
    /// Dedicated client for forwarding webhook bodies to an agent's
    /// `/events/{source}` endpoint — flat 15s timeout, distinct from
    /// `fleetctl-acp`'s per-operation-timeout client, since this path is a
    /// raw passthrough rather than a typed ACP call.
    pub forward_client: reqwest::Client,
}

impl AppState {
    pub fn new(store: Arc<DurableStore>, webhook_rate_limit: u32) -> Self {
        Self {
            store,
            webhook_limiter: RateLimiter::new(webhook_rate_limit, Duration::from_secs(60)),
            forward_client: reqwest::Client::builder()
                .timeout(Duration::from_secs(15))
                .build()
                .expect("forward client builds with valid static config"),
        }
    }
}

/// Assembles the full Axum router: webhook ingress plus a liveness probe.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(crate::http::health::health_handler))
        .route(
            "/webhooks/{agent}/{source}",
            post(crate::http::webhooks::webhook_handler),
        )
        .layer(axum::extract::DefaultBodyLimit::max(1024 * 1024))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
