//! Audit event log for kbase.
//!
//! Every successful state change is appended to an NDJSON log (one JSON
//! object per line) at `<data-dir>/events/events.ndjson`.
//!
//! # Event Format
//!
//! Each event is a JSON object with the following fields:
//! - `ts`: RFC3339 timestamp
//! - `action`: The action performed (wiki_repo_create, lock_clear, etc.)
//! - `actor`: The acting user, or `user@HOST` when there is none
//! - `resource`: Optional id or key of the affected resource
//! - `details`: Freeform object with action-specific details
//!
//! # Usage
//!
//! ```no_run
//! use kbase::context::AppContext;
//! use kbase::events::{Event, EventAction, append_event};
//! use serde_json::json;
//!
//! let ctx = AppContext::resolve(None)?;
//! let event = Event::new(EventAction::WikiRepoCreate, "alice")
//!     .with_resource("0f5c...")
//!     .with_details(json!({"path": "docs"}));
//! append_event(&ctx, &event)?;
//! # Ok::<(), kbase::error::KbError>(())
//! ```

use crate::context::AppContext;
use crate::error::{KbError, Result};
use crate::locks::get_owner_string;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::Write;

/// Actions that can be logged as events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventAction {
    /// Data directory initialization
    Init,
    WikiRepoCreate,
    WikiRepoUpdate,
    WikiRepoDelete,
    ProviderCreate,
    ProviderUpdate,
    ProviderDelete,
    ModelCreate,
    ModelUpdate,
    ModelDelete,
    ModelConfigCreate,
    ModelConfigUpdate,
    ModelConfigDelete,
    /// Lock entry cleared manually
    LockClear,
}

impl EventAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventAction::Init => "init",
            EventAction::WikiRepoCreate => "wiki_repo_create",
            EventAction::WikiRepoUpdate => "wiki_repo_update",
            EventAction::WikiRepoDelete => "wiki_repo_delete",
            EventAction::ProviderCreate => "provider_create",
            EventAction::ProviderUpdate => "provider_update",
            EventAction::ProviderDelete => "provider_delete",
            EventAction::ModelCreate => "model_create",
            EventAction::ModelUpdate => "model_update",
            EventAction::ModelDelete => "model_delete",
            EventAction::ModelConfigCreate => "model_config_create",
            EventAction::ModelConfigUpdate => "model_config_update",
            EventAction::ModelConfigDelete => "model_config_delete",
            EventAction::LockClear => "lock_clear",
        }
    }
}

impl std::fmt::Display for EventAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An event record for the audit log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// RFC3339 timestamp when the event occurred.
    pub ts: DateTime<Utc>,

    /// The action that was performed.
    pub action: EventAction,

    /// Who performed the action.
    pub actor: String,

    /// Id or key of the affected resource.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,

    /// Freeform details object with action-specific information.
    pub details: Value,
}

impl Event {
    /// Create a new event for `actor`, timestamped now.
    ///
    /// A blank actor falls back to `user@HOST` from the environment.
    pub fn new(action: EventAction, actor: &str) -> Self {
        let actor = if actor.trim().is_empty() {
            get_owner_string()
        } else {
            actor.to_string()
        };
        Self {
            ts: Utc::now(),
            action,
            actor,
            resource: None,
            details: Value::Object(serde_json::Map::new()),
        }
    }

    /// Set the affected resource for this event.
    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    /// Set the details object for this event.
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    /// Serialize the event to a single-line JSON string.
    pub fn to_ndjson_line(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| KbError::UserError(format!("failed to serialize event to JSON: {}", e)))
    }
}

/// Append an event to the events log.
///
/// The file and its directory are created on first use. Each append writes
/// exactly one line and syncs it to disk.
///
/// # Returns
///
/// * `Ok(())` - Event was successfully appended
/// * `Err(KbError::UserError)` - Serialization or write failed
pub fn append_event(ctx: &AppContext, event: &Event) -> Result<()> {
    let events_file = ctx.events_file();
    let json_line = event.to_ndjson_line()?;

    let events_dir = ctx.events_dir();
    if !events_dir.exists() {
        fs::create_dir_all(&events_dir).map_err(|e| {
            KbError::UserError(format!(
                "failed to create events directory '{}': {}",
                events_dir.display(),
                e
            ))
        })?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&events_file)
        .map_err(|e| {
            KbError::UserError(format!(
                "failed to open events file '{}': {}",
                events_file.display(),
                e
            ))
        })?;

    writeln!(file, "{}", json_line).map_err(|e| {
        KbError::UserError(format!(
            "failed to write event to '{}': {}",
            events_file.display(),
            e
        ))
    })?;

    file.sync_all().map_err(|e| {
        KbError::UserError(format!(
            "failed to sync events file '{}': {}",
            events_file.display(),
            e
        ))
    })?;

    Ok(())
}

/// Read every event in the log, oldest first.
///
/// A missing log reads as empty.
pub fn read_events(ctx: &AppContext) -> Result<Vec<Event>> {
    let events_file = ctx.events_file();
    if !events_file.exists() {
        return Ok(Vec::new());
    }

    let content = fs::read_to_string(&events_file).map_err(|e| {
        KbError::UserError(format!(
            "failed to read events file '{}': {}",
            events_file.display(),
            e
        ))
    })?;

    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .enumerate()
        .map(|(i, line)| {
            serde_json::from_str(line).map_err(|e| {
                KbError::UserError(format!(
                    "malformed event on line {} of '{}': {}",
                    i + 1,
                    events_file.display(),
                    e
                ))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_event_action_serialization() {
        assert_eq!(
            serde_json::to_string(&EventAction::WikiRepoCreate).unwrap(),
            "\"wiki_repo_create\""
        );
        assert_eq!(
            serde_json::to_string(&EventAction::LockClear).unwrap(),
            "\"lock_clear\""
        );
        assert_eq!(EventAction::ProviderDelete.to_string(), "provider_delete");
        assert_eq!(
            serde_json::to_string(&EventAction::ModelConfigCreate).unwrap(),
            "\"model_config_create\""
        );
        assert_eq!(EventAction::ModelConfigDelete.to_string(), "model_config_delete");
    }

    #[test]
    fn test_event_builder() {
        let event = Event::new(EventAction::WikiRepoCreate, "alice")
            .with_resource("repo-1")
            .with_details(json!({"path": "docs"}));

        assert_eq!(event.actor, "alice");
        assert_eq!(event.resource.as_deref(), Some("repo-1"));
        assert_eq!(event.details["path"], "docs");
    }

    #[test]
    fn test_blank_actor_falls_back_to_owner_string() {
        let event = Event::new(EventAction::Init, "");
        assert!(event.actor.contains('@'));
    }

    #[test]
    fn test_ndjson_line_is_single_line() {
        let event = Event::new(EventAction::Init, "alice")
            .with_details(json!({"text": "multi\nline"}));
        let line = event.to_ndjson_line().unwrap();

        assert!(!line.contains('\n'));
        assert!(!line.contains("resource"));
    }

    #[test]
    fn test_append_and_read_events() {
        let temp_dir = TempDir::new().unwrap();
        let ctx = AppContext::at(temp_dir.path());

        assert!(read_events(&ctx).unwrap().is_empty());

        append_event(&ctx, &Event::new(EventAction::Init, "alice")).unwrap();
        append_event(
            &ctx,
            &Event::new(EventAction::LockClear, "bob").with_resource("wiki-repo:create:docs"),
        )
        .unwrap();

        let content = std::fs::read_to_string(ctx.events_file()).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.ends_with('\n'));

        let events = read_events(&ctx).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].action, EventAction::Init);
        assert_eq!(events[1].actor, "bob");
        assert_eq!(events[1].resource.as_deref(), Some("wiki-repo:create:docs"));
    }
}
