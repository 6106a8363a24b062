//! RAII lock guard implementation.

use super::store::LockStore;
use crate::error::Result;
use std::sync::Arc;
use tracing::{debug, warn};

/// RAII guard for a held creation lock.
///
/// When dropped, the entry is released if it still carries this guard's
/// token. If the release fails, a warning is logged but no panic occurs.
#[derive(Debug)]
pub struct LockGuard {
    store: Arc<dyn LockStore>,

    key: String,

    /// Ownership token written with the entry.
    token: String,

    /// Whether the lock has been released manually.
    released: bool,
}

impl LockGuard {
    pub(super) fn new(store: Arc<dyn LockStore>, key: String, token: String) -> Self {
        Self {
            store,
            key,
            token,
            released: false,
        }
    }

    /// The locked key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The ownership token for this hold.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Manually release the lock.
    ///
    /// This is useful when you want to release the lock before the guard
    /// goes out of scope, and want to handle errors explicitly.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        self.store.release(&self.key, &self.token).map(|_| ())
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        match self.store.release(&self.key, &self.token) {
            Ok(true) => debug!(key = %self.key, token = %self.token, "released lock"),
            Ok(false) => debug!(
                key = %self.key,
                token = %self.token,
                "lock already gone at release (expired or taken over)"
            ),
            Err(e) => warn!(
                key = %self.key,
                error = %e,
                "failed to release lock; it will expire after its TTL"
            ),
        }
    }
}
