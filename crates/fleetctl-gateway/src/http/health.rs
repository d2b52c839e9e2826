use std::sync::Arc;

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::app::AppState;

/// GET /health — liveness probe. Reports a managed-agent count alongside
/// the basic ok status as ambient observability for an HTTP entry point.
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let agent_count = state.store.count_agents().unwrap_or(0);

    Json(json!({
        "status": "ok",
        "agents": agent_count,
    }))
}
