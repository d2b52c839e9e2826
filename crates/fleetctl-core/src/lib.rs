pub mod config;
pub mod crypto;
pub mod error;
pub mod trace;
pub mod types;

pub use config::FleetctlConfig;
pub use error::{FleetError, Result};
pub use types::{Agent, AgentId, AgentStatus, AuditResult, RoomId, SenderId};
