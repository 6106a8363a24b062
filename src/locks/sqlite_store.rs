//! SQLite-backed lock store.
//!
//! Entries live in a `lock_entry` table in a database file of their own
//! (`locks.db` in the data directory). Business transactions hold the write
//! lock of the main database for their whole unit of work; sharing that file
//! would make every acquisition wait on them, whatever its key.
//!
//! Every process opens its own connection; SQLite's write lock makes the
//! upsert in [`SqliteLockStore::try_acquire`] the single atomic
//! compare-and-set the creation lock relies on.

use super::entry::LockEntry;
use super::store::LockStore;
use crate::db::from_millis;
use crate::error::{KbError, Result};
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, params};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::debug;

/// Lock statements are tiny; a writer holding the file longer than this is
/// treated as a lost attempt, leaving the wait to the creation lock's deadline.
const BUSY_TIMEOUT: Duration = Duration::from_millis(250);

const SCHEMA: &str = r#"
PRAGMA journal_mode=WAL;

CREATE TABLE IF NOT EXISTS lock_entry (
  key TEXT PRIMARY KEY,
  token TEXT NOT NULL,
  owner TEXT NOT NULL,
  pid INTEGER,
  action TEXT NOT NULL,
  created_at_ms INTEGER NOT NULL,
  expires_at_ms INTEGER NOT NULL
);
"#;

const COLUMNS: &str = "key, token, owner, pid, action, created_at_ms, expires_at_ms";

/// Lock store on a dedicated connection to the lock database.
#[derive(Debug)]
pub struct SqliteLockStore {
    path: PathBuf,
    conn: Mutex<Connection>,
}

impl SqliteLockStore {
    /// Open (and if needed create) the lock table in the database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                KbError::StoreError(format!(
                    "failed to create database directory '{}': {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let conn = Connection::open(&path).map_err(|e| {
            KbError::StoreError(format!(
                "failed to open lock database '{}': {}",
                path.display(),
                e
            ))
        })?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            path,
            conn: Mutex::new(conn),
        })
    }

    /// Path of the backing database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // A panic while holding the connection does not leave it in a torn state.
        self.conn.lock().unwrap_or_else(|poison| poison.into_inner())
    }
}

impl LockStore for SqliteLockStore {
    fn try_acquire(&self, entry: &LockEntry) -> Result<bool> {
        let conn = self.conn();
        // The DO UPDATE branch only fires for an expired entry; a live one
        // leaves the row untouched and reports zero changes.
        let result = conn.execute(
            "INSERT INTO lock_entry (key, token, owner, pid, action, created_at_ms, expires_at_ms)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(key) DO UPDATE SET
               token = excluded.token,
               owner = excluded.owner,
               pid = excluded.pid,
               action = excluded.action,
               created_at_ms = excluded.created_at_ms,
               expires_at_ms = excluded.expires_at_ms
             WHERE lock_entry.expires_at_ms <= excluded.created_at_ms",
            params![
                entry.key,
                entry.token,
                entry.owner,
                entry.pid,
                entry.action,
                entry.created_at.timestamp_millis(),
                entry.expires_at.timestamp_millis(),
            ],
        );
        let changed = match result {
            Ok(changed) => changed,
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::DatabaseBusy => {
                debug!(key = %entry.key, "lock database busy, attempt lost");
                return Ok(false);
            }
            Err(e) => return Err(e.into()),
        };

        debug!(
            key = %entry.key,
            token = %entry.token,
            acquired = changed == 1,
            "sqlite lock acquisition attempt"
        );
        Ok(changed == 1)
    }

    fn release(&self, key: &str, token: &str) -> Result<bool> {
        let conn = self.conn();
        let changed = conn.execute(
            "DELETE FROM lock_entry WHERE key = ?1 AND token = ?2",
            params![key, token],
        )?;
        Ok(changed == 1)
    }

    fn get(&self, key: &str) -> Result<Option<LockEntry>> {
        let conn = self.conn();
        let sql = format!("SELECT {} FROM lock_entry WHERE key = ?1", COLUMNS);
        conn.query_row(&sql, params![key], entry_from_row)
            .optional()
            .map_err(KbError::from)
    }

    fn list(&self) -> Result<Vec<LockEntry>> {
        let conn = self.conn();
        let sql = format!("SELECT {} FROM lock_entry ORDER BY key", COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], entry_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(KbError::from)
    }
}

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<LockEntry> {
    Ok(LockEntry {
        key: row.get(0)?,
        token: row.get(1)?,
        owner: row.get(2)?,
        pid: row.get(3)?,
        action: row.get(4)?,
        created_at: from_millis(row.get(5)?),
        expires_at: from_millis(row.get(6)?),
    })
}
