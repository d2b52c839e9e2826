pub mod client;
pub mod error;
pub mod types;

pub use client::AcpClient;
pub use error::{AcpError, Result};
pub use types::{Ack, ApplyConfigRequest, ApplySecretsRequest, ApplySecretsTokenRequest, CancelRequest, HealthResponse, StatusResponse, TokenLease};
