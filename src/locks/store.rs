//! The shared store abstraction behind the creation lock.

use super::entry::LockEntry;
use crate::error::Result;
use std::fmt::Debug;

/// A store of lock entries visible to every process that uses it.
///
/// Implementations must make `try_acquire` a single atomic
/// compare-and-set: two callers racing on an absent (or expired) key may
/// never both see `true`.
pub trait LockStore: Send + Sync + Debug {
    /// Insert `entry` if its key is absent or the existing entry has expired.
    ///
    /// Returns `Ok(false)` when a live entry for the key is held by someone else.
    fn try_acquire(&self, entry: &LockEntry) -> Result<bool>;

    /// Delete the entry for `key` only if it still carries `token`.
    ///
    /// Returns whether an entry was deleted. Absent or foreign entries are not errors.
    fn release(&self, key: &str, token: &str) -> Result<bool>;

    /// Read the entry for `key`, expired or not.
    fn get(&self, key: &str) -> Result<Option<LockEntry>>;

    /// All entries in the store, expired or not, sorted by key.
    fn list(&self) -> Result<Vec<LockEntry>>;
}
