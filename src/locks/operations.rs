//! Lock store wiring, listing, and clearing operations.

use super::file_store::FileLockStore;
use super::sqlite_store::SqliteLockStore;
use super::store::LockStore;
use super::types::LockInfo;
use crate::config::{Config, LockBackend};
use crate::context::AppContext;
use crate::error::{KbError, Result};
use std::sync::Arc;

/// Open the lock store selected by `config.lock.backend`.
pub fn open_lock_store(ctx: &AppContext, config: &Config) -> Result<Arc<dyn LockStore>> {
    let store: Arc<dyn LockStore> = match config.lock.backend {
        LockBackend::Sqlite => Arc::new(SqliteLockStore::open(&ctx.lock_db_path)?),
        LockBackend::File => Arc::new(FileLockStore::new(&ctx.locks_dir)),
    };
    Ok(store)
}

/// List all entries in the store.
///
/// Expired entries are included (and flagged) until something reaps or
/// clears them.
pub fn list_locks(store: &dyn LockStore) -> Result<Vec<LockInfo>> {
    Ok(store.list()?.into_iter().map(LockInfo::from).collect())
}

/// Clear a lock entry.
///
/// Only expired entries are cleared unless `force` is set; forcing out a
/// live entry lets a second creation proceed while the first may still be
/// running, so the caller is responsible for checking that first.
///
/// Removal is scoped to the token of the entry that was inspected. If the
/// key is taken over in between, the new holder's entry is left alone.
///
/// # Returns
///
/// * `Ok(LockInfo)` - Information about the cleared lock (for audit purposes)
/// * `Err(KbError::UserError)` - No such lock, a live lock without `force`,
///   or the entry changed hands while being cleared
pub fn clear_lock(store: &dyn LockStore, key: &str, force: bool) -> Result<LockInfo> {
    let Some(entry) = store.get(key)? else {
        return Err(KbError::UserError(format!("lock '{}' does not exist", key)));
    };

    let info = LockInfo::from(entry);
    if !info.is_expired && !force {
        return Err(KbError::UserError(format!(
            "lock '{}' is still held by {} (use --force to clear it anyway)",
            key, info.entry.owner
        )));
    }

    if store.release(key, &info.entry.token)? {
        return Ok(info);
    }

    match store.get(key)? {
        // Released by its holder between the read and the removal.
        None => Ok(info),
        Some(current) => Err(KbError::UserError(format!(
            "lock '{}' was taken over by {} while being cleared; nothing was removed",
            key, current.owner
        ))),
    }
}
