//! Migration runner — sequential file-apply-and-record.
//!
//! Migration SQL is embedded at compile time and applied in file-name order.
//! Each applied file is recorded in the `migration` table together with its
//! SHA-256 hash; recorded files are skipped on later runs.  Straight-line
//! and idempotent — no concurrency, run once at startup before anything
//! touches the store.

use chrono::{SecondsFormat, Utc};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use super::Storage;
use crate::error::AppError;

/// Embedded migration files, ordered by name.
const MIGRATIONS: &[(&str, &str)] = &[(
    "0001_init.sql",
    include_str!("../../migrations/0001_init.sql"),
)];

/// Apply every migration not yet recorded in the `migration` table.
pub fn run_migrations(storage: &Storage) -> Result<(), AppError> {
    let conn = storage.conn();

    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS migration (
            migration_id INTEGER PRIMARY KEY AUTOINCREMENT,
            name         TEXT NOT NULL,
            hash         TEXT NOT NULL UNIQUE,
            created_at   TEXT NOT NULL,
            updated_at   TEXT NOT NULL
        );",
    )
    .map_err(|e| AppError::Storage(format!("initialize migration table: {e}")))?;

    let applied: Vec<String> = {
        let mut stmt = conn
            .prepare("SELECT name FROM migration")
            .map_err(|e| AppError::Storage(format!("read migration metadata: {e}")))?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| AppError::Storage(format!("read migration metadata: {e}")))?;
        rows.collect::<Result<_, _>>()
            .map_err(|e| AppError::Storage(format!("read migration metadata: {e}")))?
    };

    let mut pending: Vec<(&str, &str)> = MIGRATIONS
        .iter()
        .copied()
        .filter(|(name, _)| !applied.iter().any(|a| a == name))
        .collect();

    if pending.is_empty() {
        debug!("no migrations to run");
        return Ok(());
    }

    pending.sort_by_key(|(name, _)| *name);

    for (name, sql) in pending {
        info!(migration = %name, "running migration");

        conn.execute_batch(sql)
            .map_err(|e| AppError::Storage(format!("execute migration {name}: {e}")))?;

        let now = now_iso8601();
        conn.execute(
            "INSERT INTO migration (name, hash, created_at, updated_at) VALUES (?1, ?2, ?3, ?4)",
            (name, sha256_hex(sql), &now, &now),
        )
        .map_err(|e| AppError::Storage(format!("record migration {name}: {e}")))?;
    }

    Ok(())
}

/// Lowercase hex-encoded SHA-256 digest of `content`.
pub(crate) fn sha256_hex(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// Current UTC time as an RFC 3339 string with second precision.
pub(crate) fn now_iso8601() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}
