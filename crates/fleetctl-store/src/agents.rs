use chrono::Utc;
use fleetctl_core::{Agent, AgentId, AgentStatus};
use rusqlite::{params, OptionalExtension, Row};

use crate::db::DurableStore;
use crate::error::{Result, StoreError};

fn row_to_agent(row: &Row<'_>) -> rusqlite::Result<Agent> {
    let status_str: String = row.get("status")?;
    let status = status_str
        .parse::<AgentStatus>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, e.into()))?;

    Ok(Agent {
        id: AgentId::new(row.get::<_, String>("id")?),
        handle: row.get("handle")?,
        mxid: row.get("mxid")?,
        status,
        control_url: row.get("control_url")?,
        acp_token: row.get("acp_token")?,
        disabled: row.get::<_, i64>("disabled")? != 0,
        created_at: row.get::<_, String>("created_at")?.parse().map_err(|_| {
            rusqlite::Error::InvalidColumnType(0, "created_at".into(), rusqlite::types::Type::Text)
        })?,
        last_seen: row
            .get::<_, Option<String>>("last_seen")?
            .map(|s| s.parse())
            .transpose()
            .map_err(|_| {
                rusqlite::Error::InvalidColumnType(0, "last_seen".into(), rusqlite::types::Type::Text)
            })?,
    })
}

impl DurableStore {
    pub fn create_agent(&self, id: &AgentId, handle: &str) -> Result<Agent> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now();
        conn.execute(
            "INSERT INTO agents (id, handle, mxid, status, control_url, acp_token, disabled, created_at, last_seen)
             VALUES (?1, ?2, NULL, ?3, NULL, NULL, 0, ?4, NULL)",
            params![id.as_str(), handle, AgentStatus::Creating.to_string(), now.to_rfc3339()],
        )?;

        Ok(Agent {
            id: id.clone(),
            handle: handle.to_string(),
            mxid: None,
            status: AgentStatus::Creating,
            control_url: None,
            acp_token: None,
            disabled: false,
            created_at: now,
            last_seen: None,
        })
    }

    pub fn get_agent(&self, id: &AgentId) -> Result<Agent> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT id, handle, mxid, status, control_url, acp_token, disabled, created_at, last_seen
             FROM agents WHERE id = ?1",
            params![id.as_str()],
            row_to_agent,
        )
        .optional()?
        .ok_or(StoreError::NotFound)
    }

    /// Lists all agents whose status is not `Deleted`, newest first.
    pub fn list_agents(&self) -> Result<Vec<Agent>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, handle, mxid, status, control_url, acp_token, disabled, created_at, last_seen
             FROM agents WHERE status != ?1 ORDER BY created_at DESC",
        )?;
        let rows = stmt
            .query_map(params![AgentStatus::Deleted.to_string()], row_to_agent)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Counts agents excluding deleted ones.
    pub fn count_agents(&self) -> Result<u64> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM agents WHERE status != ?1",
            params![AgentStatus::Deleted.to_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    pub fn update_agent_status(&self, id: &AgentId, status: AgentStatus) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let rows = conn.execute(
            "UPDATE agents SET status = ?1 WHERE id = ?2",
            params![status.to_string(), id.as_str()],
        )?;
        if rows == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    /// Updates the agent's last-seen timestamp. Zero rows affected (agent
    /// does not exist) is a hard `NotFound` error: last-seen updates should
    /// never silently vanish.
    pub fn update_agent_last_seen(&self, id: &AgentId, at: chrono::DateTime<Utc>) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let rows = conn.execute(
            "UPDATE agents SET last_seen = ?1 WHERE id = ?2",
            params![at.to_rfc3339(), id.as_str()],
        )?;
        if rows == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    pub fn update_agent_handle(&self, id: &AgentId, handle: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let rows = conn.execute(
            "UPDATE agents SET handle = ?1 WHERE id = ?2",
            params![handle, id.as_str()],
        )?;
        if rows == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    pub fn update_agent_mxid(&self, id: &AgentId, mxid: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let rows = conn.execute(
            "UPDATE agents SET mxid = ?1 WHERE id = ?2",
            params![mxid, id.as_str()],
        )?;
        if rows == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    pub fn set_agent_disabled(&self, id: &AgentId, disabled: bool) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let rows = conn.execute(
            "UPDATE agents SET disabled = ?1 WHERE id = ?2",
            params![disabled as i64, id.as_str()],
        )?;
        if rows == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    pub fn set_agent_control_url(&self, id: &AgentId, control_url: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let rows = conn.execute(
            "UPDATE agents SET control_url = ?1 WHERE id = ?2",
            params![control_url, id.as_str()],
        )?;
        if rows == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    pub fn set_agent_acp_token(&self, id: &AgentId, token: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let rows = conn.execute(
            "UPDATE agents SET acp_token = ?1 WHERE id = ?2",
            params![token, id.as_str()],
        )?;
        if rows == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    /// Hard-deletes the agent row. Callers generally prefer marking an agent
    /// `Deleted` via `update_agent_status` so audit history referencing it
    /// stays intelligible; this is exposed for operator cleanup tooling.
    pub fn delete_agent(&self, id: &AgentId) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let rows = conn.execute("DELETE FROM agents WHERE id = ?1", params![id.as_str()])?;
        if rows == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_and_get_round_trips() {
        let store = DurableStore::open_in_memory().unwrap();
        let id = AgentId::new("a1");
        store.create_agent(&id, "worker-one").unwrap();

        let agent = store.get_agent(&id).unwrap();
        assert_eq!(agent.handle, "worker-one");
        assert_eq!(agent.status, AgentStatus::Creating);
        assert!(!agent.disabled);
    }

    #[test]
    fn get_missing_agent_is_not_found() {
        let store = DurableStore::open_in_memory().unwrap();
        let err = store.get_agent(&AgentId::new("missing")).unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[test]
    fn list_excludes_deleted() {
        let store = DurableStore::open_in_memory().unwrap();
        let a = AgentId::new("a");
        let b = AgentId::new("b");
        store.create_agent(&a, "a").unwrap();
        store.create_agent(&b, "b").unwrap();
        store.update_agent_status(&b, AgentStatus::Deleted).unwrap();

        let agents = store.list_agents().unwrap();
        assert_eq!(agents.len(), 1);
        assert_eq!(agents[0].id, a);
        assert_eq!(store.count_agents().unwrap(), 1);
    }

    #[test]
    fn list_orders_newest_first() {
        let store = DurableStore::open_in_memory().unwrap();
        let a = AgentId::new("a");
        let b = AgentId::new("b");
        store.create_agent(&a, "first").unwrap();
        store.create_agent(&b, "second").unwrap();

        let agents = store.list_agents().unwrap();
        assert_eq!(agents.len(), 2);
        assert_eq!(agents[0].id, b);
        assert_eq!(agents[1].id, a);
    }

    #[test]
    fn update_last_seen_on_missing_agent_is_hard_error() {
        let store = DurableStore::open_in_memory().unwrap();
        let err = store
            .update_agent_last_seen(&AgentId::new("ghost"), Utc::now())
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[test]
    fn update_last_seen_persists() {
        let store = DurableStore::open_in_memory().unwrap();
        let id = AgentId::new("a1");
        store.create_agent(&id, "worker").unwrap();
        let now = Utc::now();
        store.update_agent_last_seen(&id, now).unwrap();

        let agent = store.get_agent(&id).unwrap();
        assert!(agent.last_seen.is_some());
    }

    #[test]
    fn disable_and_delete() {
        let store = DurableStore::open_in_memory().unwrap();
        let id = AgentId::new("a1");
        store.create_agent(&id, "worker").unwrap();
        store.set_agent_disabled(&id, true).unwrap();
        assert!(store.get_agent(&id).unwrap().disabled);

        store.delete_agent(&id).unwrap();
        assert!(matches!(store.get_agent(&id).unwrap_err(), StoreError::NotFound));
    }
}
