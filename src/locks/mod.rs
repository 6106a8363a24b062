//! Locking subsystem for kbase.
//!
//! This module implements the creation lock: a named, TTL-bounded mutual
//! exclusion used to keep two callers from creating the same resource at
//! the same time, across threads and across processes.
//!
//! # Lock Keys
//!
//! Keys are rendered from templates such as `wiki-repo:create:#{path}`.
//! Callers with the same key are serialized; different keys never block
//! each other.
//!
//! # Lock Stores
//!
//! Entries live in a shared store (see [`LockStore`]):
//! - [`SqliteLockStore`]: a `lock_entry` table in the application database
//! - [`FileLockStore`]: one JSON file per key, created with **create_new**
//!
//! The entry's presence in the store is the only signal that a key is locked.
//!
//! # Lock Entries
//!
//! Each entry records:
//! - `key` and an ownership `token` unique to the acquisition
//! - `owner` (`user@HOST`) and `pid`
//! - `action` being guarded
//! - `created_at` / `expires_at`
//!
//! # RAII Guards
//!
//! Locks are held through [`LockGuard`] objects that release the entry
//! (only if it still carries their token) when dropped. If release fails,
//! a warning is logged and the entry is left to expire.

mod creation_lock;
mod entry;
mod file_store;
mod guard;
mod key;
mod operations;
mod sqlite_store;
mod store;
mod types;


// Re-export public API
pub use creation_lock::CreationLock;
pub use entry::LockEntry;
pub(crate) use entry::get_owner_string;
pub use file_store::FileLockStore;
pub use guard::LockGuard;
pub use key::KeyTemplate;
pub use operations::{clear_lock, list_locks, open_lock_store};
pub use sqlite_store::SqliteLockStore;
pub use store::LockStore;
pub use types::{LockInfo, LockPolicy};
