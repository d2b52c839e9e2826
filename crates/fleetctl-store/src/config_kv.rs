use rusqlite::{params, OptionalExtension};
use std::collections::HashMap;

use crate::db::DurableStore;
use crate::error::{Result, StoreError};

impl DurableStore {
    /// Returns `NotFound` when `key` has never been set.
    pub fn get_config(&self, key: &str) -> Result<String> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT value FROM config_kv WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()?
        .ok_or(StoreError::NotFound)
    }

    /// Upserts `key` to `value`.
    pub fn set_config(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO config_kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    /// Deletes `key` if present. Idempotent: deleting an absent key is not
    /// an error.
    pub fn delete_config(&self, key: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM config_kv WHERE key = ?1", params![key])?;
        Ok(())
    }

    /// Returns every stored key/value pair.
    pub fn list_config(&self) -> Result<HashMap<String, String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT key, value FROM config_kv")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<rusqlite::Result<HashMap<_, _>>>()?;
        Ok(rows)
    }
}
