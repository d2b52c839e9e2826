use thiserror::Error;

/// Errors surfaced by [`crate::client::AcpClient`]. Kept distinct from
/// `fleetctl_core::FleetError` so callers can match on the ACP-specific
/// shapes (a path-qualified status error, a body-size cap) before any
/// conversion at a higher boundary.
#[derive(Debug, Error)]
pub enum AcpError {
    #[error("transport error calling {path}: {source}")]
    Transport {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{path} timed out after {ms}ms")]
    Timeout { path: String, ms: u64 },

    #[error("{path} returned {status} {status_text}: {body_snippet}")]
    Status {
        path: String,
        status: u16,
        status_text: String,
        body_snippet: String,
    },

    #[error("response body from {path} exceeded the {cap} byte cap")]
    BodyTooLarge { path: String, cap: usize },

    #[error("malformed response body: {0}")]
    Malformed(String),
}

impl AcpError {
    /// Whether this error is worth retrying (transport failures and
    /// timeouts are transient; 4xx statuses and malformed bodies are not).
    pub fn is_retryable(&self) -> bool {
        matches!(self, AcpError::Transport { .. } | AcpError::Timeout { .. })
    }
}

pub type Result<T> = std::result::Result<T, AcpError>;
