//! Wiki repository records and request payloads.

use crate::config::WikiIdentity;
use crate::error::{KbError, Result};
use crate::fields::{check_len, check_max};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static PATH_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("valid path regex"));

pub const NAME_MAX: usize = 255;
pub const PATH_MAX: usize = 500;
pub const DESCRIPTION_MAX: usize = 1000;
pub const COVER_MAX: usize = 500;

/// A stored wiki repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WikiRepo {
    pub id: String,
    pub name: String,
    /// Human-chosen access path; unique among live repos in path identity mode.
    pub path: Option<String>,
    pub description: Option<String>,
    pub cover: Option<String>,
    pub embedding_model_id: String,
    pub rerank_model_id: String,
    pub creator_id: String,
    pub create_time: DateTime<Utc>,
    pub updater_id: Option<String>,
    pub update_time: Option<DateTime<Utc>>,
    pub deleted: bool,
}

/// The public view of a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WikiRepoDetail {
    pub id: String,
    pub name: String,
    pub path: Option<String>,
    pub description: Option<String>,
    pub cover: Option<String>,
    pub embedding_model_id: String,
    pub rerank_model_id: String,
}

impl From<WikiRepo> for WikiRepoDetail {
    fn from(repo: WikiRepo) -> Self {
        Self {
            id: repo.id,
            name: repo.name,
            path: repo.path,
            description: repo.description,
            cover: repo.cover,
            embedding_model_id: repo.embedding_model_id,
            rerank_model_id: repo.rerank_model_id,
        }
    }
}

/// Payload for creating a repository.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateWikiRepo {
    pub name: String,
    pub path: Option<String>,
    pub description: Option<String>,
    pub cover: Option<String>,
    pub embedding_model_id: String,
    pub rerank_model_id: String,
}

impl CreateWikiRepo {
    /// Check the payload against the field rules for `identity`.
    ///
    /// In path identity mode the path is required; in id mode it is optional
    /// but still has to be URL safe when given.
    pub fn validate(&self, identity: WikiIdentity) -> Result<()> {
        check_len("name", &self.name, 1, NAME_MAX)?;

        match (&self.path, identity) {
            (Some(path), _) => validate_path(path)?,
            (None, WikiIdentity::Path) => {
                return Err(KbError::ValidationError("path is required".to_string()));
            }
            (None, WikiIdentity::Id) => {}
        }

        check_max("description", self.description.as_deref(), DESCRIPTION_MAX)?;
        check_max("cover", self.cover.as_deref(), COVER_MAX)?;
        check_len("embedding_model_id", &self.embedding_model_id, 1, usize::MAX)?;
        check_len("rerank_model_id", &self.rerank_model_id, 1, usize::MAX)?;
        Ok(())
    }
}

/// Partial update of a repository. `None` leaves a field unchanged.
///
/// `description` and `cover` are nullable: `Some(None)` clears them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateWikiRepo {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub cover: Option<Option<String>>,
    pub embedding_model_id: Option<String>,
    pub rerank_model_id: Option<String>,
}

impl UpdateWikiRepo {
    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.name {
            check_len("name", name, 1, NAME_MAX)?;
        }
        if let Some(description) = &self.description {
            check_max("description", description.as_deref(), DESCRIPTION_MAX)?;
        }
        if let Some(cover) = &self.cover {
            check_max("cover", cover.as_deref(), COVER_MAX)?;
        }
        if let Some(id) = &self.embedding_model_id {
            check_len("embedding_model_id", id, 1, usize::MAX)?;
        }
        if let Some(id) = &self.rerank_model_id {
            check_len("rerank_model_id", id, 1, usize::MAX)?;
        }
        Ok(())
    }

    /// Whether the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply the patch to `repo`.
    pub(crate) fn apply(self, repo: &mut WikiRepo) {
        if let Some(name) = self.name {
            repo.name = name;
        }
        if let Some(description) = self.description {
            repo.description = description;
        }
        if let Some(cover) = self.cover {
            repo.cover = cover;
        }
        if let Some(id) = self.embedding_model_id {
            repo.embedding_model_id = id;
        }
        if let Some(id) = self.rerank_model_id {
            repo.rerank_model_id = id;
        }
    }
}

fn validate_path(path: &str) -> Result<()> {
    check_len("path", path, 1, PATH_MAX)?;
    if !PATH_PATTERN.is_match(path) {
        return Err(KbError::ValidationError(format!(
            "path '{}' may only contain letters, digits, '-' and '_'",
            path
        )));
    }
    Ok(())
}
