//! Webhook ingress endpoint — `POST /webhooks/{agent}/{source}`.
//!
//! Bearer/HMAC dual-mode verification built on the `hmac`+`sha2`+`hex`
//! crate trio, with a per-agent, per-gateway lookup against
//! `fleetctl-store` to resolve which auth mode and secret apply.

use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use tracing::warn;

use fleetctl_core::{AgentId, AgentStatus};
use fleetctl_store::GatewayConfig;

use crate::app::AppState;

type HmacSha256 = Hmac<Sha256>;

const DEFAULT_CONTENT_TYPE: &str = "application/json";
const FORWARD_BODY_CAP: usize = 1024 * 1024;

pub async fn webhook_handler(
    State(state): State<Arc<AppState>>,
    Path((agent_id, source)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    match handle(&state, &agent_id, &source, &headers, &body).await {
        Ok(status) => Response::builder()
            .status(status)
            .body(Body::empty())
            .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response()),
        Err((status, message)) => (status, Json(json!({ "error": message }))).into_response(),
    }
}

async fn handle(
    state: &AppState,
    agent_id: &str,
    source: &str,
    headers: &HeaderMap,
    body: &Bytes,
) -> Result<StatusCode, (StatusCode, String)> {
    let agent_id = AgentId::new(agent_id);

    // A disabled or absent agent look identical to the caller — a 404 that
    // tells an unauthenticated prober nothing about whether the ID exists.
    let agent = state.store.get_agent(&agent_id).map_err(|_| not_found())?;
    if agent.disabled || agent.status == AgentStatus::Deleted {
        return Err(not_found());
    }
    let control_url = agent.control_url.clone().ok_or_else(|| {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            "agent has no control URL configured".to_string(),
        )
    })?;

    if !state.webhook_limiter.allow(agent_id.as_str()) {
        return Err((
            StatusCode::TOO_MANY_REQUESTS,
            "rate limit exceeded".to_string(),
        ));
    }

    let gateway = state
        .store
        .get_gateway_config(&agent_id, source)
        .map_err(|_| not_found())?;

    authenticate(&gateway, headers, body, agent.acp_token.as_deref())?;

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or(DEFAULT_CONTENT_TYPE)
        .to_string();

    let url = format!("{}/events/{}", control_url.trim_end_matches('/'), source);
    let mut request = state
        .forward_client
        .post(&url)
        .header(header::CONTENT_TYPE, content_type)
        .body(body.clone());
    if let Some(token) = &agent.acp_token {
        request = request.bearer_auth(token);
    }

    let response = request.send().await.map_err(|e| {
        warn!(agent_id = %agent_id, source = %source, error = %e, "upstream agent unreachable");
        (
            StatusCode::BAD_GATEWAY,
            "upstream agent unreachable".to_string(),
        )
    })?;

    let status = StatusCode::from_u16(response.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    drain_capped(response, FORWARD_BODY_CAP).await;

    Ok(status)
}

fn not_found() -> (StatusCode, String) {
    (StatusCode::NOT_FOUND, "not found".to_string())
}

fn unauthorized() -> (StatusCode, String) {
    // Never more specific than "unauthorized" in the body — deliberately
    // generic to avoid leaking which check failed.
    (StatusCode::UNAUTHORIZED, "unauthorized".to_string())
}

fn authenticate(
    gateway: &GatewayConfig,
    headers: &HeaderMap,
    body: &Bytes,
    acp_token: Option<&str>,
) -> Result<(), (StatusCode, String)> {
    match gateway.auth_type.as_str() {
        "bearer" | "" => verify_bearer(headers, acp_token),
        "hmac-sha256" => verify_hmac(headers, body, gateway.secret.as_deref()),
        other => {
            warn!(auth_type = %other, "unrecognised webhook auth type");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                "unsupported authentication type configured for this gateway".to_string(),
            ))
        }
    }
}

/// Verify `Authorization: Bearer <token>` against the agent's stored ACP
/// token. An agent with no stored token is in dev mode — bearer auth is
/// accepted unconditionally.
fn verify_bearer(headers: &HeaderMap, acp_token: Option<&str>) -> Result<(), (StatusCode, String)> {
    let Some(expected) = acp_token else {
        return Ok(());
    };
    let provided = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(unauthorized)?;

    if provided == expected {
        Ok(())
    } else {
        Err(unauthorized())
    }
}

/// Verify GitHub-style HMAC-SHA256: `sha256=<hex>` in `X-Hub-Signature-256`,
/// compared in constant time via `hmac::Mac::verify_slice`.
fn verify_hmac(headers: &HeaderMap, body: &Bytes, secret: Option<&str>) -> Result<(), (StatusCode, String)> {
    let secret = secret.ok_or_else(|| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "no HMAC secret configured for this gateway".to_string(),
        )
    })?;

    let sig_header = headers
        .get("x-hub-signature-256")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(unauthorized)?;
    let hex_sig = sig_header.strip_prefix("sha256=").ok_or_else(unauthorized)?;
    let expected = hex::decode(hex_sig).map_err(|_| unauthorized())?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| unauthorized())?;
    mac.update(body);
    mac.verify_slice(&expected).map_err(|_| unauthorized())
}

/// Reads and discards the upstream response body, aborting early past the
/// cap rather than buffering an unbounded agent response.
async fn drain_capped(mut response: reqwest::Response, cap: usize) {
    let mut total = 0usize;
    while let Ok(Some(chunk)) = response.chunk().await {
        total += chunk.len();
        if total > cap {
            break;
        }
    }
}

