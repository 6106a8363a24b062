//! Config data model.

use super::types::{
    LockBackend, WikiIdentity, default_poll_interval_ms, default_provider_lock_key,
    default_provider_lock_message, default_ttl_ms, default_wait_timeout_ms,
    default_wiki_lock_message,
};
use crate::locks::LockPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for kbase.
///
/// This struct represents the contents of `<data-dir>/config.yaml`.
/// Unknown fields in the YAML are ignored for forward compatibility.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Creation lock settings.
    pub lock: LockSettings,

    /// Wiki repository settings.
    pub wiki: WikiSettings,

    /// Model provider settings.
    pub provider: ProviderSettings,
}

/// Lock store and timing settings shared by every guarded creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LockSettings {
    /// Which shared store keeps lock entries.
    pub backend: LockBackend,

    /// Milliseconds before a held lock expires on its own.
    #[serde(default = "default_ttl_ms")]
    pub ttl_ms: u64,

    /// Milliseconds a caller waits for a held lock before giving up.
    #[serde(default = "default_wait_timeout_ms")]
    pub wait_timeout_ms: u64,

    /// Milliseconds between acquisition attempts while waiting.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for LockSettings {
    fn default() -> Self {
        Self {
            backend: LockBackend::default(),
            ttl_ms: default_ttl_ms(),
            wait_timeout_ms: default_wait_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl LockSettings {
    /// Build the acquisition policy with the given timeout message.
    pub fn policy(&self, timeout_message: &str) -> LockPolicy {
        LockPolicy {
            ttl: Duration::from_millis(self.ttl_ms),
            wait_timeout: Duration::from_millis(self.wait_timeout_ms),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            timeout_message: timeout_message.to_string(),
        }
    }
}

/// Wiki repository settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WikiSettings {
    /// Natural key mode.
    pub identity: WikiIdentity,

    /// Override for the creation lock key template.
    pub create_lock_key: Option<String>,

    /// Message returned when the creation lock times out.
    #[serde(default = "default_wiki_lock_message")]
    pub create_lock_message: String,
}

impl Default for WikiSettings {
    fn default() -> Self {
        Self {
            identity: WikiIdentity::default(),
            create_lock_key: None,
            create_lock_message: default_wiki_lock_message(),
        }
    }
}

impl WikiSettings {
    /// The effective creation lock key template.
    pub fn create_lock_template(&self) -> &str {
        self.create_lock_key
            .as_deref()
            .unwrap_or_else(|| self.identity.default_lock_key())
    }
}

/// Model provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    /// Creation lock key template.
    #[serde(default = "default_provider_lock_key")]
    pub create_lock_key: String,

    /// Message returned when the creation lock times out.
    #[serde(default = "default_provider_lock_message")]
    pub create_lock_message: String,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            create_lock_key: default_provider_lock_key(),
            create_lock_message: default_provider_lock_message(),
        }
    }
}
