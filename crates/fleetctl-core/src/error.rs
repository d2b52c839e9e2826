use thiserror::Error;

/// Workspace-wide error taxonomy shared by every component.
///
/// Individual crates define their own tighter error enums (`StoreError`,
/// `ClassifierError`, `AcpError`, ...) and convert into this one at their
/// public boundary, for the gateway's HTTP layer to handle uniformly.
#[derive(Debug, Error)]
pub enum FleetError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("rate limit exceeded for {0}")]
    RateLimit(String),

    #[error("upstream rate limit exceeded")]
    UpstreamRateLimit,

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("timed out after {ms}ms")]
    Timeout { ms: u64 },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl FleetError {
    /// Stable short code, useful for audit rows and HTTP error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            FleetError::NotFound(_) => "NOT_FOUND",
            FleetError::Validation(_) => "VALIDATION",
            FleetError::Auth(_) => "AUTH",
            FleetError::RateLimit(_) => "RATE_LIMIT",
            FleetError::UpstreamRateLimit => "UPSTREAM_RATE_LIMIT",
            FleetError::Malformed(_) => "MALFORMED",
            FleetError::Timeout { .. } => "TIMEOUT",
            FleetError::Transport(_) => "TRANSPORT",
            FleetError::Configuration(_) => "CONFIGURATION",
            FleetError::Internal(_) => "INTERNAL",
        }
    }
}

pub type Result<T> = std::result::Result<T, FleetError>;
