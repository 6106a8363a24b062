//! Lock entry records and utilities.

use crate::error::{KbError, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use uuid::Uuid;

/// One held lock as recorded in the shared store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockEntry {
    /// The lock key (e.g., `wiki-repo:create:my-wiki`).
    pub key: String,

    /// Ownership token, unique per acquisition attempt.
    pub token: String,

    /// Owner of the lock (e.g., `user@HOST`).
    pub owner: String,

    /// Process ID of the lock holder (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,

    /// The action being guarded (wiki_repo_create, ...).
    pub action: String,

    /// When the lock was taken.
    pub created_at: DateTime<Utc>,

    /// When the lock stops counting as held.
    pub expires_at: DateTime<Utc>,
}

impl LockEntry {
    /// Create a new entry with a fresh token, starting now.
    pub fn new(key: &str, action: &str, ttl: std::time::Duration) -> Self {
        Self::with_token(key, &new_token(), action, ttl)
    }

    /// Create a new entry for an existing token, starting now.
    pub fn with_token(key: &str, token: &str, action: &str, ttl: std::time::Duration) -> Self {
        let created_at = Utc::now();
        let ttl = Duration::from_std(ttl).unwrap_or(Duration::MAX);
        Self {
            key: key.to_string(),
            token: token.to_string(),
            owner: get_owner_string(),
            pid: Some(std::process::id()),
            action: action.to_string(),
            created_at,
            expires_at: created_at.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    /// Parse an entry from a lock file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            KbError::StoreError(format!(
                "failed to read lock file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;

        serde_json::from_str(&content).map_err(|e| {
            KbError::StoreError(format!(
                "failed to parse lock file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })
    }

    /// Serialize the entry to a JSON string.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| KbError::StoreError(format!("failed to serialize lock entry: {}", e)))
    }

    /// The configured lifetime of the entry.
    pub fn ttl(&self) -> Duration {
        self.expires_at.signed_duration_since(self.created_at)
    }

    /// Whether the entry has expired at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Whether the entry has expired.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Calculate the age of the lock.
    pub fn age(&self) -> Duration {
        Utc::now().signed_duration_since(self.created_at)
    }

    /// Time left before expiry, zero once expired.
    pub fn remaining(&self) -> Duration {
        let left = self.expires_at.signed_duration_since(Utc::now());
        if left < Duration::zero() {
            Duration::zero()
        } else {
            left
        }
    }

    /// Format the age as a human-readable string.
    pub fn age_string(&self) -> String {
        format_duration(self.age())
    }
}

/// Format a duration as `Xd Yh`, `Xh Ym`, `Xm Ys` or `Xs`.
pub(crate) fn format_duration(d: Duration) -> String {
    let seconds = d.num_seconds().max(0);
    let minutes = seconds / 60;
    let hours = minutes / 60;
    let days = hours / 24;

    if days > 0 {
        format!("{}d {}h", days, hours % 24)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes % 60)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds % 60)
    } else {
        format!("{}s", seconds)
    }
}

/// Generate an opaque ownership token.
pub(crate) fn new_token() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Get the owner string for lock entries.
pub(crate) fn get_owner_string() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());

    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    format!("{}@{}", user, host)
}
