use chrono::Utc;
use fleetctl_core::AuditResult;
use rusqlite::{params, Row};
use serde_json::Value;

use crate::db::DurableStore;
use crate::error::{Result, StoreError};

/// An append-only audit log row. `id` is the database's monotonically
/// increasing row ID — audit entries are never updated or deleted, so it
/// doubles as an ordering key. `actor_id` names who (or what automation)
/// performed the action; `target` is the optional object the action acted
/// on (an agent ID, a config key, …); `payload` is an optional free-form
/// JSON blob recording the action's arguments.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub id: i64,
    pub trace_id: String,
    pub actor_id: String,
    pub action: String,
    pub target: Option<String>,
    pub payload: Option<Value>,
    pub result: AuditResult,
    pub error_message: Option<String>,
    pub created_at: chrono::DateTime<Utc>,
}

fn row_to_entry(row: &Row<'_>) -> rusqlite::Result<AuditEntry> {
    let result_str: String = row.get("result")?;
    let result = result_str
        .parse::<AuditResult>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, e.into()))?;
    let payload_json: Option<String> = row.get("payload")?;
    let payload = payload_json
        .map(|s| serde_json::from_str(&s))
        .transpose()
        .map_err(|_| rusqlite::Error::InvalidColumnType(0, "payload".into(), rusqlite::types::Type::Text))?;

    Ok(AuditEntry {
        id: row.get("id")?,
        trace_id: row.get("trace_id")?,
        actor_id: row.get("actor_id")?,
        action: row.get("action")?,
        target: row.get("target")?,
        payload,
        result,
        error_message: row.get("error_message")?,
        created_at: row.get::<_, String>("created_at")?.parse().map_err(|_| {
            rusqlite::Error::InvalidColumnType(0, "created_at".into(), rusqlite::types::Type::Text)
        })?,
    })
}

impl DurableStore {
    /// Appends an audit entry. The audit log is append-only: no update or
    /// delete method is exposed. `payload` is encoded as JSON when present;
    /// `error_message` should only be set alongside `AuditResult::Error`.
    #[allow(clippy::too_many_arguments)]
    pub fn write_audit(
        &self,
        trace_id: &str,
        actor_id: &str,
        action: &str,
        target: Option<&str>,
        payload: Option<&Value>,
        result: AuditResult,
        error_message: Option<&str>,
    ) -> Result<AuditEntry> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now();
        let payload_json = payload
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        conn.execute(
            "INSERT INTO audit_log (trace_id, actor_id, action, target, payload, result, error_message, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                trace_id,
                actor_id,
                action,
                target,
                payload_json,
                result.to_string(),
                error_message,
                now.to_rfc3339(),
            ],
        )?;
        let id = conn.last_insert_rowid();

        Ok(AuditEntry {
            id,
            trace_id: trace_id.to_string(),
            actor_id: actor_id.to_string(),
            action: action.to_string(),
            target: target.map(str::to_string),
            payload: payload.cloned(),
            result,
            error_message: error_message.map(str::to_string),
            created_at: now,
        })
    }

    /// Returns the `n` most recent audit entries in descending recency
    /// order, newest first.
    pub fn tail_audit(&self, n: u32) -> Result<Vec<AuditEntry>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, trace_id, actor_id, action, target, payload, result, error_message, created_at
             FROM audit_log ORDER BY id DESC LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![n], row_to_entry)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Returns every audit entry sharing `trace_id`, in ascending (oldest
    /// first) order — the order a reader would want to replay a request's
    /// causal history.
    pub fn audit_by_trace(&self, trace_id: &str) -> Result<Vec<AuditEntry>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, trace_id, actor_id, action, target, payload, result, error_message, created_at
             FROM audit_log WHERE trace_id = ?1 ORDER BY id ASC",
        )?;
        let rows = stmt
            .query_map(params![trace_id], row_to_entry)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}
