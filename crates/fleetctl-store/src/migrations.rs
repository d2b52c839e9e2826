use include_dir::{include_dir, Dir};
use rusqlite::Connection;

use crate::error::{Result, StoreError};

static MIGRATIONS_DIR: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/migrations");

struct Migration {
    version: u32,
    description: String,
    sql: &'static str,
}

fn load_migrations() -> Result<Vec<Migration>> {
    let mut migrations = Vec::new();

    for file in MIGRATIONS_DIR.files() {
        let name = file
            .path()
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| StoreError::Migration("non-UTF8 migration filename".into()))?;

        let stem = name
            .strip_suffix(".sql")
            .ok_or_else(|| StoreError::Migration(format!("migration file without .sql extension: {name}")))?;

        let (prefix, description) = stem
            .split_once('_')
            .ok_or_else(|| StoreError::Migration(format!("migration filename missing description: {name}")))?;

        let version: u32 = prefix
            .parse()
            .map_err(|_| StoreError::Migration(format!("migration filename prefix is not numeric: {name}")))?;

        let sql = file
            .contents_utf8()
            .ok_or_else(|| StoreError::Migration(format!("migration file is not valid UTF-8: {name}")))?;

        migrations.push(Migration {
            version,
            description: description.to_string(),
            sql,
        });
    }

    migrations.sort_by_key(|m| m.version);

    for window in migrations.windows(2) {
        if window[0].version == window[1].version {
            return Err(StoreError::Migration(format!(
                "duplicate migration version {}",
                window[0].version
            )));
        }
    }

    Ok(migrations)
}

/// Applies every embedded migration whose version is not yet present in
/// `schema_migrations`, in ascending numeric order, inside one transaction
/// per migration. Migrations are forward-only: there is no down-migration
/// path, matching the durable store's append-only design.
pub fn run(conn: &mut Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY,
            applied_at  TEXT NOT NULL,
            description TEXT NOT NULL
        );",
    )?;

    let migrations = load_migrations()?;

    for migration in migrations {
        let already_applied: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM schema_migrations WHERE version = ?1)",
            [migration.version],
            |row| row.get(0),
        )?;
        if already_applied {
            continue;
        }

        tracing::info!(version = migration.version, description = %migration.description, "applying migration");

        let tx = conn.transaction()?;
        tx.execute_batch(migration.sql)?;
        tx.execute(
            "INSERT INTO schema_migrations (version, applied_at, description) VALUES (?1, ?2, ?3)",
            rusqlite::params![
                migration.version,
                chrono::Utc::now().to_rfc3339(),
                migration.description,
            ],
        )?;
        tx.commit()?;
    }

    Ok(())
}
