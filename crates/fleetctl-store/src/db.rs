use std::sync::Mutex;

use rusqlite::Connection;

use crate::error::Result;
use crate::migrations;

/// Durable state store backed by a single SQLite connection, matching the
/// `Mutex<Connection>`-per-manager shape used throughout this codebase.
/// SQLite operations here are fast and synchronous (WAL mode, local disk),
/// so callers invoke these methods directly from async code without a
/// `spawn_blocking` wrapper.
pub struct DurableStore {
    pub(crate) conn: Mutex<Connection>,
}

impl DurableStore {
    pub fn open(path: &str) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        Self::configure(&mut conn)?;
        migrations::run(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        Self::configure(&mut conn)?;
        migrations::run(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn configure(conn: &mut Connection) -> Result<()> {
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA cache_size = -8000;
             PRAGMA busy_timeout = 5000;",
        )?;
        Ok(())
    }
}
