//! Lock policy and lock information structures.

use super::entry::{LockEntry, format_duration};
use std::time::Duration;

/// Timing and messaging for one kind of guarded creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockPolicy {
    /// How long a held lock survives without an explicit release.
    pub ttl: Duration,

    /// How long a caller waits for a held lock.
    pub wait_timeout: Duration,

    /// Delay between acquisition attempts while waiting.
    pub poll_interval: Duration,

    /// Message carried by `LockTimeout`.
    pub timeout_message: String,
}

impl Default for LockPolicy {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(10),
            wait_timeout: Duration::from_secs(2),
            poll_interval: Duration::from_millis(25),
            timeout_message: "resource creation in progress, please retry later".to_string(),
        }
    }
}

/// Information about an entry in the lock store.
#[derive(Debug, Clone)]
pub struct LockInfo {
    /// The stored entry.
    pub entry: LockEntry,

    /// Whether the entry has outlived its TTL.
    pub is_expired: bool,
}

impl From<LockEntry> for LockInfo {
    fn from(entry: LockEntry) -> Self {
        let is_expired = entry.is_expired();
        Self { entry, is_expired }
    }
}

impl std::fmt::Display for LockInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (owner: {}, age: {}, action: {}",
            self.entry.key,
            self.entry.owner,
            self.entry.age_string(),
            self.entry.action,
        )?;
        if self.is_expired {
            write!(f, ", EXPIRED)")
        } else {
            write!(f, ", expires in {})", format_duration(self.entry.remaining()))
        }
    }
}
