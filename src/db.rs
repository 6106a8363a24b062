//! SQLite persistence for kbase.
//!
//! One database file per data directory is shared by every process. Each
//! [`Database`] owns its own connection; business writes go through
//! [`Database::unit_of_work`], which commits when the closure succeeds and
//! rolls back otherwise.

use crate::error::{KbError, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = r#"
PRAGMA journal_mode=WAL;
PRAGMA synchronous=NORMAL;

CREATE TABLE IF NOT EXISTS meta (
  key TEXT PRIMARY KEY,
  value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS wiki_repo (
  id TEXT PRIMARY KEY,
  name TEXT NOT NULL,
  path TEXT,
  description TEXT,
  cover TEXT,
  embedding_model_id TEXT NOT NULL,
  rerank_model_id TEXT NOT NULL,
  creator_id TEXT NOT NULL,
  create_time_ms INTEGER NOT NULL,
  updater_id TEXT,
  update_time_ms INTEGER,
  deleted INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_wiki_repo_path ON wiki_repo(path);
CREATE INDEX IF NOT EXISTS idx_wiki_repo_creator ON wiki_repo(creator_id);

CREATE TABLE IF NOT EXISTS model_provider (
  id TEXT PRIMARY KEY,
  platform TEXT NOT NULL,
  api_key TEXT NOT NULL,
  api_base_url TEXT,
  description TEXT,
  config_json TEXT,
  creator_id TEXT NOT NULL,
  create_time_ms INTEGER NOT NULL,
  updater_id TEXT,
  update_time_ms INTEGER,
  deleted INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_model_provider_creator ON model_provider(creator_id, platform);

CREATE TABLE IF NOT EXISTS model (
  id TEXT PRIMARY KEY,
  provider_id TEXT NOT NULL,
  name TEXT NOT NULL,
  model_type TEXT NOT NULL,
  context_length INTEGER,
  creator_id TEXT NOT NULL,
  create_time_ms INTEGER NOT NULL,
  updater_id TEXT,
  update_time_ms INTEGER,
  deleted INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_model_creator ON model(creator_id, provider_id);

CREATE TABLE IF NOT EXISTS model_config (
  id TEXT PRIMARY KEY,
  provider_id TEXT,
  temperature REAL,
  max_tokens INTEGER,
  top_p REAL,
  frequency_penalty REAL,
  presence_penalty REAL,
  other_config_json TEXT,
  creator_id TEXT NOT NULL,
  create_time_ms INTEGER NOT NULL,
  updater_id TEXT,
  update_time_ms INTEGER,
  deleted INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_model_config_provider ON model_config(provider_id);
"#;

/// A connection to the shared database.
#[derive(Debug)]
pub struct Database {
    path: PathBuf,
    conn: Connection,
}

impl Database {
    /// Open the database at `path`, creating the file and schema if needed.
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
                "failed to open database '{}': {}",
                path.display(),
                e
            ))
        })?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        let db = Self { path, conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        self.conn.execute_batch(SCHEMA)?;
        self.conn.execute(
            "INSERT OR IGNORE INTO meta(key, value) VALUES (?1, ?2)",
            rusqlite::params!["schema_version", "1"],
        )?;
        Ok(())
    }

    /// Path of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read-only access outside a unit of work.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Run `f` in one all-or-nothing transaction.
    ///
    /// The transaction takes the write lock up front (`BEGIN IMMEDIATE`) so a
    /// read-then-write body never fails half way on a lock upgrade. `Ok`
    /// commits; `Err` rolls back and is returned unchanged. A panic inside
    /// `f` rolls back when the transaction is dropped.
    pub fn unit_of_work<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        match f(&tx) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback() {
                    warn!(error = %rollback_err, "failed to roll back transaction");
                }
                Err(err)
            }
        }
    }
}

/// Current time truncated to the millisecond precision stored in the database.
pub fn now() -> DateTime<Utc> {
    from_millis(Utc::now().timestamp_millis())
}

/// Convert stored milliseconds back into a timestamp.
pub fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(ms).unwrap_or(DateTime::<Utc>::MIN_UTC)
}
