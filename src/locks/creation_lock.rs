//! Named, TTL-bounded mutual exclusion over a shared lock store.

use super::entry::{LockEntry, new_token};
use super::guard::LockGuard;
use super::store::LockStore;
use super::types::LockPolicy;
use crate::error::{KbError, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Instant;
use tracing::{debug, warn};

/// Acquires and releases named locks in a shared [`LockStore`].
///
/// Waiting is done by polling the store every `poll_interval` until the
/// key frees up or `wait_timeout` elapses. Waiters are not queued; whichever
/// poll lands first after a release wins.
#[derive(Debug, Clone)]
pub struct CreationLock {
    store: Arc<dyn LockStore>,
    policy: LockPolicy,
}

impl CreationLock {
    pub fn new(store: Arc<dyn LockStore>, policy: LockPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> &LockPolicy {
        &self.policy
    }

    pub fn store(&self) -> &Arc<dyn LockStore> {
        &self.store
    }

    /// Acquire `key`, blocking up to the policy's wait timeout.
    ///
    /// # Returns
    ///
    /// * `Ok(LockGuard)` - The lock is held until the guard is dropped or released
    /// * `Err(KbError::LockTimeout)` - Another holder kept the key past the wait timeout
    /// * `Err(KbError::StoreError)` - The store could not be reached (never proceeds unlocked)
    /// * `Err(KbError::UserError)` - The key is empty
    pub fn acquire(&self, key: &str, action: &str) -> Result<LockGuard> {
        self.acquire_inner(key, action, None)
    }

    /// Like [`CreationLock::acquire`], but gives up with `Cancelled` as soon
    /// as `cancel` is set.
    pub fn acquire_cancellable(
        &self,
        key: &str,
        action: &str,
        cancel: &AtomicBool,
    ) -> Result<LockGuard> {
        self.acquire_inner(key, action, Some(cancel))
    }

    /// Release `key` if it is still held with `token`.
    ///
    /// Releasing an absent, expired or foreign entry is a no-op.
    pub fn release(&self, key: &str, token: &str) -> Result<()> {
        let removed = self.store.release(key, token)?;
        if !removed {
            debug!(key = %key, token = %token, "release found no entry for token");
        }
        Ok(())
    }

    /// Run `f` while holding `key`; the lock is released on every exit path.
    pub fn with_lock<T, F>(&self, key: &str, action: &str, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        let _guard = self.acquire(key, action)?;
        f()
    }

    fn acquire_inner(
        &self,
        key: &str,
        action: &str,
        cancel: Option<&AtomicBool>,
    ) -> Result<LockGuard> {
        if key.trim().is_empty() {
            return Err(KbError::UserError("lock key must not be empty".to_string()));
        }

        let cancelled = || cancel.is_some_and(|flag| flag.load(Ordering::Acquire));
        let token = new_token();
        // A wait too long to represent as an instant never times out.
        let deadline = Instant::now().checked_add(self.policy.wait_timeout);
        let mut attempts: u32 = 0;

        loop {
            if cancelled() {
                return Err(KbError::Cancelled(key.to_string()));
            }

            attempts += 1;
            // Expiry is measured from the attempt that succeeds, not the first one.
            let entry = LockEntry::with_token(key, &token, action, self.policy.ttl);
            if self.store.try_acquire(&entry)? {
                let guard = LockGuard::new(self.store.clone(), key.to_string(), token);
                if cancelled() {
                    // Acquired after the caller stopped waiting; hand the key straight back.
                    drop(guard);
                    return Err(KbError::Cancelled(key.to_string()));
                }
                debug!(key = %key, attempts, "acquired lock");
                return Ok(guard);
            }

            let now = Instant::now();
            let remaining = deadline.map(|d| d.saturating_duration_since(now));
            if remaining.is_some_and(|r| r.is_zero()) {
                warn!(
                    key = %key,
                    attempts,
                    wait_ms = self.policy.wait_timeout.as_millis() as u64,
                    "timed out waiting for lock"
                );
                return Err(KbError::LockTimeout(self.policy.timeout_message.clone()));
            }
            let pause = match remaining {
                Some(remaining) => self.policy.poll_interval.min(remaining),
                None => self.policy.poll_interval,
            };
            thread::sleep(pause);
        }
    }
}
