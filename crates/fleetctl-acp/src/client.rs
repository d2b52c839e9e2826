use std::time::Duration;

use fleetctl_core::trace::generate_id;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{AcpError, Result};
use crate::types::{Ack, ErrorBody, HealthResponse, StatusResponse, TokenLease};

/// Response bodies are read through a bounded reader so a misbehaving or
/// compromised agent can never make the control plane buffer an unbounded
/// payload in memory: the status is checked first, then the body is read
/// in capped chunks.
const MAX_BODY_BYTES: usize = 1024 * 1024;
const BODY_SNIPPET_CAP: usize = 200;

const HEALTH_TIMEOUT: Duration = Duration::from_secs(2);
const STATUS_TIMEOUT: Duration = Duration::from_secs(3);
const APPLY_CONFIG_TIMEOUT: Duration = Duration::from_secs(30);
const APPLY_SECRETS_TIMEOUT: Duration = Duration::from_secs(15);
const RESTART_TIMEOUT: Duration = Duration::from_secs(30);
const CANCEL_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for one agent's Agent Control Protocol endpoint.
///
/// Deliberately does not set a shared timeout on the underlying
/// `reqwest::Client`: a shared timeout would abort long-running mutation
/// calls mid-flight on their own retries. Every operation instead wraps
/// its call in a per-operation
/// `tokio::time::timeout`.
pub struct AcpClient {
    client: reqwest::Client,
    control_url: String,
    bearer: Option<String>,
}

impl AcpClient {
    pub fn new(control_url: impl Into<String>, bearer: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            control_url: control_url.into(),
            bearer: bearer.filter(|b| !b.is_empty()),
        }
    }

    pub async fn health(&self, trace_id: Option<&str>) -> Result<HealthResponse> {
        self.get("/health", HEALTH_TIMEOUT, trace_id).await
    }

    pub async fn status(&self, trace_id: Option<&str>) -> Result<StatusResponse> {
        self.get("/status", STATUS_TIMEOUT, trace_id).await
    }

    pub async fn apply_config(&self, gosuto: Value, trace_id: Option<&str>) -> Result<Ack> {
        self.post_mutating("/config/apply", APPLY_CONFIG_TIMEOUT, trace_id, &gosuto)
            .await
    }

    pub async fn apply_secrets(&self, secrets: Value, trace_id: Option<&str>) -> Result<Ack> {
        self.post_mutating("/secrets/apply", APPLY_SECRETS_TIMEOUT, trace_id, &secrets)
            .await
    }

    pub async fn apply_secrets_token(&self, lease: TokenLease, trace_id: Option<&str>) -> Result<Ack> {
        self.post_mutating(
            "/secrets/token",
            APPLY_SECRETS_TIMEOUT,
            trace_id,
            &serde_json::json!({ "lease": lease }),
        )
        .await
    }

    pub async fn restart(&self, trace_id: Option<&str>) -> Result<Ack> {
        self.post_mutating("/process/restart", RESTART_TIMEOUT, trace_id, &Value::Null)
            .await
    }

    pub async fn cancel(&self, task_id: &str, trace_id: Option<&str>) -> Result<Ack> {
        self.post_mutating(
            "/tasks/cancel",
            CANCEL_TIMEOUT,
            trace_id,
            &serde_json::json!({ "task_id": task_id }),
        )
        .await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, timeout: Duration, trace_id: Option<&str>) -> Result<T> {
        let body = self.send(reqwest::Method::GET, path, timeout, trace_id, false, None).await?;
        self.parse(path, &body)
    }

    async fn post_mutating<T: DeserializeOwned>(
        &self,
        path: &str,
        timeout: Duration,
        trace_id: Option<&str>,
        body: &Value,
    ) -> Result<T> {
        let bytes = self
            .send(reqwest::Method::POST, path, timeout, trace_id, true, Some(body.clone()))
            .await?;
        self.parse(path, &bytes)
    }

    fn parse<T: DeserializeOwned>(&self, path: &str, bytes: &[u8]) -> Result<T> {
        if bytes.is_empty() {
            return serde_json::from_value(Value::Null)
                .map_err(|_| AcpError::Malformed(format!("{path} returned an empty body")));
        }
        serde_json::from_slice(bytes)
            .map_err(|e| AcpError::Malformed(format!("{path}: {e}")))
    }

    async fn send(
        &self,
        method: reqwest::Method,
        path: &str,
        timeout: Duration,
        trace_id: Option<&str>,
        mutating: bool,
        body: Option<Value>,
    ) -> Result<Vec<u8>> {
        let url = format!("{}{}", self.control_url.trim_end_matches('/'), path);
        let request_id = generate_id();

        let mut builder = self.client.request(method, &url);
        if let Some(token) = &self.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(trace) = trace_id {
            builder = builder.header("X-Trace-ID", trace);
        }
        builder = builder.header("X-Request-ID", &request_id);
        if mutating {
            builder = builder.header("X-Idempotency-Key", &request_id);
        }
        if let Some(json_body) = &body {
            builder = builder.json(json_body);
        }

        let response = tokio::time::timeout(timeout, builder.send())
            .await
            .map_err(|_| AcpError::Timeout {
                path: path.to_string(),
                ms: timeout.as_millis() as u64,
            })?
            .map_err(|source| AcpError::Transport {
                path: path.to_string(),
                source,
            })?;

        let status = response.status();
        let body_bytes = read_capped(response, path, MAX_BODY_BYTES).await?;

        if status.as_u16() >= 400 {
            let snippet = body_snippet(&body_bytes);
            let message = serde_json::from_slice::<ErrorBody>(&body_bytes)
                .ok()
                .map(|e| e.error)
                .unwrap_or(snippet);
            return Err(AcpError::Status {
                path: path.to_string(),
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or("").to_string(),
                body_snippet: message,
            });
        }

        Ok(body_bytes)
    }
}

/// Reads a response body chunk by chunk, aborting the moment the running
/// total exceeds `cap` rather than materialising the whole payload first —
/// the difference between this and a plain `.bytes().await` call.
async fn read_capped(mut response: reqwest::Response, path: &str, cap: usize) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    while let Some(chunk) = response.chunk().await.map_err(|source| AcpError::Transport {
        path: path.to_string(),
        source,
    })? {
        buf.extend_from_slice(&chunk);
        if buf.len() > cap {
            return Err(AcpError::BodyTooLarge {
                path: path.to_string(),
                cap,
            });
        }
    }
    Ok(buf)
}

fn body_snippet(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    text.chars().take(BODY_SNIPPET_CAP).collect()
}
