use fleetctl_core::AgentId;
use rusqlite::{params, OptionalExtension, Row};

use crate::db::DurableStore;
use crate::error::{Result, StoreError};

/// Webhook ingress configuration for one `(agent, source)` pair, as recorded
/// in an agent's Gosuto document.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub agent_id: AgentId,
    pub source: String,
    pub auth_type: String,
    pub secret: Option<String>,
}

fn row_to_config(row: &Row<'_>) -> rusqlite::Result<GatewayConfig> {
    Ok(GatewayConfig {
        agent_id: AgentId::new(row.get::<_, String>("agent_id")?),
        source: row.get("source")?,
        auth_type: row.get("auth_type")?,
        secret: row.get("secret")?,
    })
}

impl DurableStore {
    pub fn upsert_gateway_config(
        &self,
        agent_id: &AgentId,
        source: &str,
        auth_type: &str,
        secret: Option<&str>,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO gateway_configs (agent_id, source, auth_type, secret)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(agent_id, source) DO UPDATE SET
                auth_type = excluded.auth_type,
                secret = excluded.secret",
            params![agent_id.as_str(), source, auth_type, secret],
        )?;
        Ok(())
    }

    /// Returns `NotFound` when no gateway is configured for this
    /// `(agent_id, source)` pair — the same outcome the webhook proxy
    /// returns to the caller as an HTTP 404 to avoid leaking which agents
    /// exist.
    pub fn get_gateway_config(&self, agent_id: &AgentId, source: &str) -> Result<GatewayConfig> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT agent_id, source, auth_type, secret FROM gateway_configs
             WHERE agent_id = ?1 AND source = ?2",
            params![agent_id.as_str(), source],
            row_to_config,
        )
        .optional()?
        .ok_or(StoreError::NotFound)
    }
}
