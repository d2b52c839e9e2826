use chrono::Utc;
use fleetctl_core::AgentId;
use rusqlite::{params, OptionalExtension, Row};
use uuid::Uuid;

use crate::db::DurableStore;
use crate::error::{Result, StoreError};

/// A single stored version of an agent's Gosuto configuration document.
/// Versions are append-only; there is no update-in-place.
#[derive(Debug, Clone)]
pub struct GosutoVersion {
    pub id: String,
    pub agent_id: AgentId,
    pub version: i64,
    pub content: String,
    pub created_at: chrono::DateTime<Utc>,
}

fn row_to_version(row: &Row<'_>) -> rusqlite::Result<GosutoVersion> {
    Ok(GosutoVersion {
        id: row.get("id")?,
        agent_id: AgentId::new(row.get::<_, String>("agent_id")?),
        version: row.get("version")?,
        content: row.get("content")?,
        created_at: row.get::<_, String>("created_at")?.parse().map_err(|_| {
            rusqlite::Error::InvalidColumnType(0, "created_at".into(), rusqlite::types::Type::Text)
        })?,
    })
}

impl DurableStore {
    /// Records a new Gosuto version for `agent_id`, one greater than the
    /// highest version currently stored (starting at 1).
    pub fn record_gosuto_version(&self, agent_id: &AgentId, content: &str) -> Result<GosutoVersion> {
        let conn = self.conn.lock().unwrap();
        let next_version: i64 = conn
            .query_row(
                "SELECT COALESCE(MAX(version), 0) + 1 FROM gosuto_versions WHERE agent_id = ?1",
                params![agent_id.as_str()],
                |row| row.get(0),
            )?;

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        conn.execute(
            "INSERT INTO gosuto_versions (id, agent_id, version, content, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![id, agent_id.as_str(), next_version, content, now.to_rfc3339()],
        )?;

        Ok(GosutoVersion {
            id,
            agent_id: agent_id.clone(),
            version: next_version,
            content: content.to_string(),
            created_at: now,
        })
    }

    /// Returns the highest-versioned Gosuto document for `agent_id`.
    pub fn latest_gosuto_version(&self, agent_id: &AgentId) -> Result<GosutoVersion> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT id, agent_id, version, content, created_at FROM gosuto_versions
             WHERE agent_id = ?1 ORDER BY version DESC LIMIT 1",
            params![agent_id.as_str()],
            row_to_version,
        )
        .optional()?
        .ok_or(StoreError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn versions_increment_from_one() {
        let store = DurableStore::open_in_memory().unwrap();
        let agent = AgentId::new("a1");
        let v1 = store.record_gosuto_version(&agent, "one").unwrap();
        let v2 = store.record_gosuto_version(&agent, "two").unwrap();
        assert_eq!(v1.version, 1);
        assert_eq!(v2.version, 2);
    }

    #[test]
    fn latest_returns_highest_version() {
        let store = DurableStore::open_in_memory().unwrap();
        let agent = AgentId::new("a1");
        store.record_gosuto_version(&agent, "one").unwrap();
        store.record_gosuto_version(&agent, "two").unwrap();

        let latest = store.latest_gosuto_version(&agent).unwrap();
        assert_eq!(latest.version, 2);
        assert_eq!(latest.content, "two");
    }

    #[test]
    fn missing_agent_is_not_found() {
        let store = DurableStore::open_in_memory().unwrap();
        let err = store.latest_gosuto_version(&AgentId::new("ghost")).unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[test]
    fn per_agent_versions_are_independent() {
        let store = DurableStore::open_in_memory().unwrap();
        let a = AgentId::new("a");
        let b = AgentId::new("b");
        store.record_gosuto_version(&a, "a1").unwrap();
        store.record_gosuto_version(&b, "b1").unwrap();
        store.record_gosuto_version(&a, "a2").unwrap();

        assert_eq!(store.latest_gosuto_version(&a).unwrap().version, 2);
        assert_eq!(store.latest_gosuto_version(&b).unwrap().version, 1);
    }
}
