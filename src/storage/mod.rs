//! SQLite persistence.
//!
//! [`Storage`] owns a single `rusqlite::Connection` behind a mutex — the
//! connection is not `Sync`, and the write volume here (a handful of rows
//! per command invocation) does not justify a pool.  Schema changes are
//! applied by the [`migrate`] runner at startup.

pub mod loot_repo;
pub mod migrate;

pub use migrate::run_migrations;
pub(crate) use migrate::sha256_hex;

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::Connection;

use crate::error::AppError;

pub struct Storage {
    conn: Mutex<Connection>,
}

impl Storage {
    /// Open (creating if necessary) the database at `db_path` and apply the
    /// recommended pragmas.
    ///
    /// Pragmas applied:
    /// - `journal_mode = WAL` — allows concurrent readers alongside a writer.
    /// - `foreign_keys = ON` — enforce FK constraints.
    /// - `busy_timeout = 5000` — wait up to 5 s before returning `SQLITE_BUSY`.
    pub fn open(db_path: &Path) -> Result<Self, AppError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| AppError::Storage(format!("create {}: {e}", parent.display())))?;
        }

        let conn = Connection::open(db_path)
            .map_err(|e| AppError::Storage(format!("open {}: {e}", db_path.display())))?;

        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| AppError::Storage(format!("set journal_mode WAL: {e}")))?;
        conn.pragma_update(None, "foreign_keys", "ON")
            .map_err(|e| AppError::Storage(format!("set foreign_keys ON: {e}")))?;
        conn.pragma_update(None, "busy_timeout", 5000)
            .map_err(|e| AppError::Storage(format!("set busy_timeout: {e}")))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Lock the underlying connection.  Held only for the duration of one
    /// statement or batch; never across an await.
    pub(crate) fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}
