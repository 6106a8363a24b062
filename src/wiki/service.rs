//! Wiki repository operations.

use super::model::{CreateWikiRepo, UpdateWikiRepo, WikiRepo, WikiRepoDetail};
use super::repository;
use crate::config::{Config, WikiIdentity, WikiSettings};
use crate::context::AppContext;
use crate::creation::CreationGuard;
use crate::db::{self, Database};
use crate::error::{KbError, Result, codes};
use crate::locks::{CreationLock, open_lock_store};
use tracing::info;
use uuid::Uuid;

/// Lock action recorded for repository creation.
pub const CREATE_ACTION: &str = "wiki_repo_create";

/// Wiki repository service bound to one database connection.
#[derive(Debug)]
pub struct WikiRepoService {
    db: Database,
    guard: CreationGuard,
    identity: WikiIdentity,
}

impl WikiRepoService {
    /// Build the service from an open database and a creation lock whose
    /// policy carries the wiki timeout message.
    pub fn new(db: Database, lock: CreationLock, settings: &WikiSettings) -> Result<Self> {
        let template = settings.lock_template()?;
        Ok(Self {
            db,
            guard: CreationGuard::new(lock, template, CREATE_ACTION),
            identity: settings.identity,
        })
    }

    /// Open the service against the data directory in `ctx`.
    pub fn open(ctx: &AppContext, config: &Config) -> Result<Self> {
        let store = open_lock_store(ctx, config)?;
        let lock = CreationLock::new(
            store,
            config.lock.policy(&config.wiki.create_lock_message),
        );
        Self::new(Database::open(&ctx.db_path)?, lock, &config.wiki)
    }

    /// Create a repository owned by `creator_id`.
    ///
    /// Runs under the creation lock. In path identity mode the path is
    /// checked against live repos while the lock is held.
    ///
    /// # Errors
    ///
    /// * `ValidationError` - the payload breaks a field rule
    /// * `DuplicateKey` - a live repo already uses the path
    /// * `LockTimeout` - another creation for the same key is still running
    pub fn create(&mut self, payload: CreateWikiRepo, creator_id: &str) -> Result<WikiRepo> {
        payload.validate(self.identity)?;

        let path = payload.path.clone().unwrap_or_default();
        let name = payload.name.clone();
        let args = [
            ("path", path.as_str()),
            ("name", name.as_str()),
            ("creator_id", creator_id),
        ];
        let identity = self.identity;

        let repo = self.guard.run(&args, &mut self.db, |tx| {
            if identity == WikiIdentity::Path
                && let Some(path) = &payload.path
                && repository::path_exists(tx, path)?
            {
                return Err(KbError::DuplicateKey {
                    code: codes::WIKI_REPO_PATH_EXISTS,
                    message: format!("access path '{}' already exists", path),
                });
            }

            let repo = WikiRepo {
                id: Uuid::new_v4().to_string(),
                name: payload.name,
                path: payload.path,
                description: payload.description,
                cover: payload.cover,
                embedding_model_id: payload.embedding_model_id,
                rerank_model_id: payload.rerank_model_id,
                creator_id: creator_id.to_string(),
                create_time: db::now(),
                updater_id: None,
                update_time: None,
                deleted: false,
            };
            repository::insert(tx, &repo)?;
            Ok(repo)
        })?;

        info!(id = %repo.id, path = ?repo.path, creator = %creator_id, "created wiki repository");
        Ok(repo)
    }

    /// Live repos created by `creator_id`, most recently updated first.
    pub fn list(&self, creator_id: &str) -> Result<Vec<WikiRepo>> {
        repository::list_by_creator(self.db.connection(), creator_id)
    }

    pub fn get_by_path(&self, path: &str) -> Result<WikiRepoDetail> {
        repository::find_by_path(self.db.connection(), path)?
            .map(WikiRepoDetail::from)
            .ok_or_else(|| not_found(path))
    }

    pub fn get_by_id(&self, id: &str) -> Result<WikiRepoDetail> {
        repository::find_by_id(self.db.connection(), id)?
            .map(WikiRepoDetail::from)
            .ok_or_else(|| not_found(id))
    }

    /// Look a repo up by id, falling back to its path.
    pub fn get(&self, id_or_path: &str) -> Result<WikiRepoDetail> {
        match self.get_by_id(id_or_path) {
            Err(KbError::NotFound { .. }) => self.get_by_path(id_or_path),
            other => other,
        }
    }

    /// Apply `patch` to the repo `id` on behalf of `user_id`.
    ///
    /// # Errors
    ///
    /// * `NotFound` - no live repo has this id
    /// * `AccessDenied` - `user_id` did not create the repo
    pub fn update(&mut self, id: &str, patch: UpdateWikiRepo, user_id: &str) -> Result<WikiRepo> {
        patch.validate()?;

        let repo = self.db.unit_of_work(|tx| {
            let mut repo = owned_repo(tx, id, user_id)?;
            patch.apply(&mut repo);
            repo.updater_id = Some(user_id.to_string());
            repo.update_time = Some(db::now());
            repository::update(tx, &repo)?;
            Ok(repo)
        })?;

        info!(id = %id, user = %user_id, "updated wiki repository");
        Ok(repo)
    }

    /// Soft-delete the repo `id` on behalf of `user_id`.
    ///
    /// A deleted repo's path becomes available again in path identity mode.
    pub fn delete(&mut self, id: &str, user_id: &str) -> Result<()> {
        self.db.unit_of_work(|tx| {
            owned_repo(tx, id, user_id)?;
            repository::soft_delete(tx, id, user_id, db::now().timestamp_millis())
        })?;

        info!(id = %id, user = %user_id, "deleted wiki repository");
        Ok(())
    }
}

fn owned_repo(conn: &rusqlite::Connection, id: &str, user_id: &str) -> Result<WikiRepo> {
    let repo = repository::find_by_id(conn, id)?.ok_or_else(|| not_found(id))?;
    if repo.creator_id != user_id {
        return Err(KbError::AccessDenied {
            code: codes::WIKI_REPO_ACCESS_DENIED,
            message: format!("no access to wiki repository '{}'", id),
        });
    }
    Ok(repo)
}

fn not_found(reference: &str) -> KbError {
    KbError::NotFound {
        code: codes::WIKI_REPO_NOT_FOUND,
        message: format!("wiki repository '{}' not found", reference),
    }
}
