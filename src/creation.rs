//! Guarded resource creation.
//!
//! A [`CreationGuard`] wraps a creation unit of work: it renders the lock
//! key from the request, holds the creation lock for the key, runs the unit
//! in one database transaction, and releases the lock once the transaction
//! has committed or rolled back.

use crate::db::Database;
use crate::error::Result;
use crate::locks::{CreationLock, KeyTemplate};
use rusqlite::Transaction;
use tracing::debug;

/// Serializes creations that share a lock key.
#[derive(Debug, Clone)]
pub struct CreationGuard {
    lock: CreationLock,
    template: KeyTemplate,
    action: String,
}

impl CreationGuard {
    pub fn new(lock: CreationLock, template: KeyTemplate, action: &str) -> Self {
        Self {
            lock,
            template,
            action: action.to_string(),
        }
    }

    /// The key template this guard renders.
    pub fn template(&self) -> &KeyTemplate {
        &self.template
    }

    pub fn lock(&self) -> &CreationLock {
        &self.lock
    }

    /// Run `unit` under the creation lock for the key rendered from `args`.
    ///
    /// The unit sees one transaction: returning `Ok` commits it, returning
    /// `Err` (or panicking) rolls it back. The lock is held until the
    /// transaction is finished either way, then released.
    ///
    /// # Errors
    ///
    /// * `UserError` - `args` is missing a value the template needs
    /// * `LockTimeout` - another creation held the key for the whole wait
    /// * `StoreError` - the lock store or database failed
    /// * anything the unit returns
    pub fn run<T, F>(&self, args: &[(&str, &str)], db: &mut Database, unit: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        let key = self.template.render(args)?;
        let guard = self.lock.acquire(&key, &self.action)?;
        debug!(key = %key, action = %self.action, "running guarded creation");

        let result = db.unit_of_work(unit);
        drop(guard);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KbError;
    use crate::locks::{LockPolicy, LockStore, SqliteLockStore};
    use rusqlite::params;
    use std::sync::{Arc, mpsc};
    use std::thread;
    use std::time::{Duration, Instant};
    use tempfile::TempDir;

    struct Fixture {
        _temp_dir: TempDir,
        db: Database,
        store: Arc<dyn LockStore>,
        guard: CreationGuard,
    }

    fn fixture(template: &str) -> Fixture {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::open(temp_dir.path().join("kbase.db")).unwrap();
        let store: Arc<dyn LockStore> =
            Arc::new(SqliteLockStore::open(temp_dir.path().join("locks.db")).unwrap());
        let policy = LockPolicy {
            ttl: Duration::from_secs(10),
            wait_timeout: Duration::from_millis(100),
            poll_interval: Duration::from_millis(10),
            timeout_message: "busy, retry later".to_string(),
        };
        let guard = CreationGuard::new(
            CreationLock::new(store.clone(), policy),
            KeyTemplate::parse(template).unwrap(),
            "test_create",
        );
        Fixture {
            _temp_dir: temp_dir,
            db,
            store,
            guard,
        }
    }

    fn insert_meta(tx: &Transaction<'_>, key: &str) -> Result<()> {
        tx.execute(
            "INSERT INTO meta(key, value) VALUES (?1, 'x')",
            params![key],
        )?;
        Ok(())
    }

    fn meta_exists(db: &Database, key: &str) -> bool {
        db.connection()
            .query_row("SELECT COUNT(*) FROM meta WHERE key = ?1", params![key], |row| {
                row.get::<_, i64>(0)
            })
            .unwrap()
            == 1
    }

    #[test]
    fn test_run_holds_lock_during_unit() {
        let mut f = fixture("thing:create:#{name}");
        let store = f.store.clone();

        let value = f
            .guard
            .run(&[("name", "a")], &mut f.db, |tx| {
                let held = store.get("thing:create:a")?.expect("lock held during unit");
                assert_eq!(held.action, "test_create");
                insert_meta(tx, "test:a")?;
                Ok(7)
            })
            .unwrap();

        assert_eq!(value, 7);
        assert!(meta_exists(&f.db, "test:a"));
        assert!(f.store.get("thing:create:a").unwrap().is_none());
    }

    #[test]
    fn test_failed_unit_rolls_back_and_releases() {
        let mut f = fixture("thing:create:#{name}");

        let result: Result<()> = f.guard.run(&[("name", "a")], &mut f.db, |tx| {
            insert_meta(tx, "test:a")?;
            Err(KbError::ValidationError("rejected".to_string()))
        });

        assert!(matches!(result, Err(KbError::ValidationError(_))));
        assert!(!meta_exists(&f.db, "test:a"));
        assert!(f.store.get("thing:create:a").unwrap().is_none());

        // A retry does not wait on a leftover entry.
        f.guard
            .run(&[("name", "a")], &mut f.db, |tx| insert_meta(tx, "test:a"))
            .unwrap();
        assert!(meta_exists(&f.db, "test:a"));
    }

    #[test]
    fn test_panicking_unit_releases() {
        let mut f = fixture("thing:create:#{name}");
        let guard = f.guard.clone();

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _: Result<()> = guard.run(&[("name", "a")], &mut f.db, |tx| {
                insert_meta(tx, "test:a").unwrap();
                panic!("unit blew up");
            });
        }));

        assert!(outcome.is_err());
        assert!(!meta_exists(&f.db, "test:a"));
        assert!(f.store.get("thing:create:a").unwrap().is_none());
    }

    #[test]
    fn test_missing_argument_runs_nothing() {
        let mut f = fixture("thing:create:#{name}");

        let result: Result<()> = f.guard.run(&[("other", "x")], &mut f.db, |_| {
            panic!("unit must not run without a key");
        });

        assert!(matches!(result, Err(KbError::UserError(_))));
        assert!(f.store.list().unwrap().is_empty());
    }

    #[test]
    fn test_held_key_times_out_without_running_unit() {
        let mut f = fixture("thing:create:#{name}");
        let _holder = f.guard.lock().acquire("thing:create:a", "other").unwrap();

        let result: Result<()> = f.guard.run(&[("name", "a")], &mut f.db, |_| {
            panic!("unit must not run while the key is held");
        });

        match result {
            Err(KbError::LockTimeout(message)) => assert_eq!(message, "busy, retry later"),
            other => panic!("expected LockTimeout, got {other:?}"),
        }
    }

    #[test]
    fn test_other_keys_proceed_while_one_is_held() {
        let mut f = fixture("thing:create:#{name}");
        let _holder = f.guard.lock().acquire("thing:create:a", "other").unwrap();

        f.guard
            .run(&[("name", "b")], &mut f.db, |tx| insert_meta(tx, "test:b"))
            .unwrap();
        assert!(meta_exists(&f.db, "test:b"));
    }

    #[test]
    fn test_running_unit_does_not_delay_other_keys() {
        let Fixture {
            _temp_dir: temp_dir,
            mut db,
            guard,
            ..
        } = fixture("thing:create:#{name}");
        let (started_tx, started_rx) = mpsc::channel();

        let worker = thread::spawn(move || {
            guard.run(&[("name", "a")], &mut db, |tx| {
                insert_meta(tx, "test:a")?;
                started_tx.send(()).unwrap();
                thread::sleep(Duration::from_millis(600));
                Ok(())
            })
        });
        started_rx.recv().unwrap();

        // A separate connection, as another process would have.
        let store: Arc<dyn LockStore> =
            Arc::new(SqliteLockStore::open(temp_dir.path().join("locks.db")).unwrap());
        let other = CreationLock::new(
            store,
            LockPolicy {
                ttl: Duration::from_secs(10),
                wait_timeout: Duration::from_millis(200),
                poll_interval: Duration::from_millis(10),
                timeout_message: "busy".to_string(),
            },
        );

        let start = Instant::now();
        let held = other.acquire("thing:create:b", "other").unwrap();
        let elapsed = start.elapsed();
        assert!(
            elapsed < Duration::from_millis(300),
            "key b waited {elapsed:?} on key a's transaction"
        );

        drop(held);
        worker.join().unwrap().unwrap();
    }
}
