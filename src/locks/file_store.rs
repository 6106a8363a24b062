//! File-backed lock store.
//!
//! Each key maps to one JSON file in a shared locks directory. Files are
//! created with **create_new** semantics (exclusive create), so only one
//! process can take an absent key.
//!
//! Files cannot be compared-and-deleted atomically, so expiry takeover and
//! release go through a rename first: the entry is moved to a private
//! tombstone name, checked, and either deleted or linked back into place.
//! If a third process creates the key during that short window, the entry
//! that was linked back is lost and its holder's later release is a no-op.

use super::entry::LockEntry;
use super::store::LockStore;
use crate::error::{KbError, Result};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, warn};
use uuid::Uuid;

const LOCK_EXTENSION: &str = "lock";

/// Lock store over a directory of lock files.
#[derive(Debug, Clone)]
pub struct FileLockStore {
    dir: PathBuf,
}

impl FileLockStore {
    /// Use `dir` as the locks directory, creating it on first acquisition.
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    /// The locks directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the lock file for `key`.
    pub fn lock_path(&self, key: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{}", encode_key(key), LOCK_EXTENSION))
    }

    fn ensure_dir(&self) -> Result<()> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir).map_err(|e| {
                KbError::StoreError(format!(
                    "failed to create locks directory '{}': {}",
                    self.dir.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Try to create the lock file exclusively.
    ///
    /// Returns `Ok(false)` if the file already exists.
    fn create_exclusive(&self, path: &Path, entry: &LockEntry) -> Result<bool> {
        let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(false),
            Err(e) => {
                return Err(KbError::StoreError(format!(
                    "failed to create lock file '{}': {}",
                    path.display(),
                    e
                )));
            }
        };

        let json = entry.to_json()?;
        file.write_all(json.as_bytes()).map_err(|e| {
            // Clean up the lock file on write failure
            let _ = fs::remove_file(path);
            KbError::StoreError(format!("failed to write lock entry: {}", e))
        })?;

        file.sync_all().map_err(|e| {
            // Clean up the lock file on sync failure
            let _ = fs::remove_file(path);
            KbError::StoreError(format!("failed to sync lock file: {}", e))
        })?;

        Ok(true)
    }

    /// Move the file at `path` aside, delete it if `should_remove` approves
    /// of what was moved, otherwise put it back.
    ///
    /// Returns whether anything was removed.
    fn take_if<F>(&self, path: &Path, should_remove: F) -> Result<bool>
    where
        F: Fn(&Path, Option<&LockEntry>) -> bool,
    {
        let tombstone = path.with_extension(format!(
            "{}.{}.reap",
            LOCK_EXTENSION,
            Uuid::new_v4().simple()
        ));

        match fs::rename(path, &tombstone) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(e) => {
                return Err(KbError::StoreError(format!(
                    "failed to move lock file '{}': {}",
                    path.display(),
                    e
                )));
            }
        }

        let taken = LockEntry::from_file(&tombstone).ok();
        if should_remove(&tombstone, taken.as_ref()) {
            fs::remove_file(&tombstone).map_err(|e| {
                KbError::StoreError(format!(
                    "failed to remove lock file '{}': {}",
                    tombstone.display(),
                    e
                ))
            })?;
            return Ok(true);
        }

        // Not ours to remove: link it back unless the key was retaken meanwhile.
        match fs::hard_link(&tombstone, path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                warn!(
                    path = %path.display(),
                    "lock entry displaced while being inspected"
                );
            }
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to restore lock entry"
                );
            }
        }
        let _ = fs::remove_file(&tombstone);
        Ok(false)
    }
}

impl LockStore for FileLockStore {
    fn try_acquire(&self, entry: &LockEntry) -> Result<bool> {
        self.ensure_dir()?;
        let path = self.lock_path(&entry.key);

        // One retry after reaping an expired entry; losing the retry means
        // another caller took the key first.
        for _ in 0..2 {
            if self.create_exclusive(&path, entry)? {
                debug!(key = %entry.key, token = %entry.token, "created lock file");
                return Ok(true);
            }

            let now = entry.created_at;
            let ttl = entry.ttl();
            let reaped = match LockEntry::from_file(&path) {
                Ok(existing) if !existing.is_expired_at(now) => return Ok(false),
                Ok(existing) => {
                    let expired_token = existing.token;
                    self.take_if(&path, |_, taken| {
                        taken.is_some_and(|t| t.token == expired_token && t.is_expired_at(now))
                    })?
                }
                Err(_) => {
                    // Unreadable: either mid-write or left by a crash before
                    // the write. Only reap once it is older than our TTL.
                    if !older_than(&path, ttl) {
                        return Ok(false);
                    }
                    self.take_if(&path, |tombstone, taken| {
                        taken.is_none() && older_than(tombstone, ttl)
                    })?
                }
            };

            if reaped {
                debug!(key = %entry.key, "reaped expired lock file");
            }
        }

        Ok(false)
    }

    fn release(&self, key: &str, token: &str) -> Result<bool> {
        let path = self.lock_path(key);
        match LockEntry::from_file(&path) {
            Ok(existing) if existing.token == token => {}
            // Absent, foreign or unreadable: nothing of ours to delete.
            _ => return Ok(false),
        }

        self.take_if(&path, |_, taken| taken.is_some_and(|t| t.token == token))
    }

    fn get(&self, key: &str) -> Result<Option<LockEntry>> {
        let path = self.lock_path(key);
        if !path.exists() {
            return Ok(None);
        }
        LockEntry::from_file(&path).map(Some)
    }

    fn list(&self) -> Result<Vec<LockEntry>> {
        let mut entries = Vec::new();

        if !self.dir.exists() {
            return Ok(entries);
        }

        let dir_entries = fs::read_dir(&self.dir).map_err(|e| {
            KbError::StoreError(format!(
                "failed to read locks directory '{}': {}",
                self.dir.display(),
                e
            ))
        })?;

        for dir_entry in dir_entries {
            let dir_entry = dir_entry.map_err(|e| {
                KbError::StoreError(format!("failed to read locks directory entry: {}", e))
            })?;

            let path = dir_entry.path();

            // Skip non-lock files (tombstones, stray files)
            if path.extension().and_then(|e| e.to_str()) != Some(LOCK_EXTENSION) {
                continue;
            }

            match LockEntry::from_file(&path) {
                Ok(entry) => entries.push(entry),
                Err(_) => continue, // Skip invalid lock files
            }
        }

        entries.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(entries)
    }
}

/// Make a key safe to use as a file name.
///
/// ASCII letters, digits, `-`, `_` and `.` pass through; every other byte
/// becomes `%XX`.
pub(crate) fn encode_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for byte in key.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' => out.push(byte as char),
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

fn older_than(path: &Path, age: chrono::Duration) -> bool {
    let Ok(age) = age.to_std() else {
        return false;
    };
    fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|modified| SystemTime::now().duration_since(modified).ok())
        .is_some_and(|elapsed| elapsed > age)
}
