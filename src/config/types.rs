//! Configuration enums and their default values.

use serde::{Deserialize, Serialize};

/// Where lock entries are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LockBackend {
    /// A `lock_entry` table inside the shared SQLite database (default).
    #[default]
    Sqlite,
    /// One JSON file per key under `<data-dir>/locks/`.
    File,
}

impl LockBackend {
    /// Parse a backend name.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "sqlite" => Some(Self::Sqlite),
            "file" => Some(Self::File),
            _ => None,
        }
    }
}

/// How a wiki repository is identified, which also decides how its creation
/// lock key is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WikiIdentity {
    /// Repositories are addressed by a caller-chosen unique path.
    #[default]
    Path,
    /// Repositories are addressed by a generated id; paths are not unique.
    Id,
}

impl WikiIdentity {
    /// Parse an identity mode.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "path" => Some(Self::Path),
            "id" => Some(Self::Id),
            _ => None,
        }
    }

    /// Key template used when `wiki.create_lock_key` is not set.
    pub fn default_lock_key(&self) -> &'static str {
        match self {
            WikiIdentity::Path => "wiki-repo:create:#{path}",
            WikiIdentity::Id => "wiki-repo:create",
        }
    }
}

/// Upper bound for `lock.wait_timeout_ms` (one hour).
pub const MAX_WAIT_TIMEOUT_MS: u64 = 60 * 60 * 1000;

pub(crate) fn default_ttl_ms() -> u64 {
    10_000
}
pub(crate) fn default_wait_timeout_ms() -> u64 {
    2_000
}
pub(crate) fn default_poll_interval_ms() -> u64 {
    25
}
pub(crate) fn default_wiki_lock_message() -> String {
    "wiki repository creation in progress, please retry later".to_string()
}
pub(crate) fn default_provider_lock_key() -> String {
    "model-provider:create:#{creator_id}:#{platform}".to_string()
}
pub(crate) fn default_provider_lock_message() -> String {
    "model provider creation in progress, please retry later".to_string()
}
