use serde::{Deserialize, Serialize};

/// Health-check response body from `GET /health`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(default)]
    pub version: Option<String>,
}

/// Status response body from `GET /status`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StatusResponse {
    pub state: String,
    #[serde(default)]
    pub detail: Option<String>,
}

/// Opaque reference to a redeemable secret, as handed back by the
/// Kuze secret-redemption service (out of scope here — this type is the
/// ACP wire contract only). Never carries plaintext.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenLease {
    pub secret_ref: String,
    pub redemption_token: String,
    pub redemption_url: String,
}

/// Body for `POST /config/apply`.
#[derive(Debug, Clone, Serialize)]
pub struct ApplyConfigRequest {
    pub gosuto: serde_json::Value,
}

/// Body for `POST /secrets/apply`.
#[derive(Debug, Clone, Serialize)]
pub struct ApplySecretsRequest {
    pub secrets: serde_json::Value,
}

/// Body for `POST /secrets/token`.
#[derive(Debug, Clone, Serialize)]
pub struct ApplySecretsTokenRequest {
    pub lease: TokenLease,
}

/// Body for `POST /tasks/cancel`.
#[derive(Debug, Clone, Serialize)]
pub struct CancelRequest {
    pub task_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorBody {
    pub error: String,
}

/// Generic `{"ok": true}`-shaped acknowledgement returned by the mutating
/// endpoints that have no richer response payload.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Ack {
    #[serde(default)]
    pub ok: bool,
}
