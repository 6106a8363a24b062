//! Model provider operations.

use super::model::{CreateModelProvider, ModelProvider, UpdateModelProvider};
use super::repository;
use crate::config::{Config, ProviderSettings};
use crate::context::AppContext;
use crate::creation::CreationGuard;
use crate::db::{self, Database};
use crate::error::{KbError, Result, codes};
use crate::locks::{CreationLock, open_lock_store};
use crate::model::provider_types;
use tracing::info;
use uuid::Uuid;

/// Lock action recorded for provider registration.
pub const CREATE_ACTION: &str = "provider_create";

/// Model provider service bound to one database connection.
#[derive(Debug)]
pub struct ModelProviderService {
    db: Database,
    guard: CreationGuard,
}

impl ModelProviderService {
    pub fn new(db: Database, lock: CreationLock, settings: &ProviderSettings) -> Result<Self> {
        let template = settings.lock_template()?;
        Ok(Self {
            db,
            guard: CreationGuard::new(lock, template, CREATE_ACTION),
        })
    }

    /// Open the service against the data directory in `ctx`.
    pub fn open(ctx: &AppContext, config: &Config) -> Result<Self> {
        let store = open_lock_store(ctx, config)?;
        let lock = CreationLock::new(
            store,
            config.lock.policy(&config.provider.create_lock_message),
        );
        Self::new(Database::open(&ctx.db_path)?, lock, &config.provider)
    }

    /// Register a provider for `creator_id`.
    ///
    /// Each creator may hold one live provider per platform; the check runs
    /// under the creation lock for that creator and platform.
    pub fn create(
        &mut self,
        payload: CreateModelProvider,
        creator_id: &str,
    ) -> Result<ModelProvider> {
        payload.validate()?;

        let platform = payload.platform;
        let args = [("creator_id", creator_id), ("platform", platform.as_str())];

        let provider = self.guard.run(&args, &mut self.db, |tx| {
            if repository::platform_exists(tx, platform, creator_id)? {
                return Err(KbError::DuplicateKey {
                    code: codes::MODEL_PROVIDER_PLATFORM_EXISTS,
                    message: format!("platform {} already exists", platform),
                });
            }

            let provider = ModelProvider {
                id: Uuid::new_v4().to_string(),
                platform,
                api_key: payload.api_key,
                api_base_url: payload.api_base_url,
                description: payload.description,
                config: payload.config.filter(|c| !c.is_null()),
                model_types: Vec::new(),
                creator_id: creator_id.to_string(),
                create_time: db::now(),
                updater_id: None,
                update_time: None,
                deleted: false,
            };
            repository::insert(tx, &provider)?;
            Ok(provider)
        })?;

        info!(id = %provider.id, platform = %platform, creator = %creator_id, "created model provider");
        Ok(provider)
    }

    /// Live providers of `creator_id`, each with the types of its models.
    pub fn list(&self, creator_id: &str) -> Result<Vec<ModelProvider>> {
        let conn = self.db.connection();
        repository::list_by_creator(conn, creator_id)?
            .into_iter()
            .map(|provider| with_model_types(conn, provider))
            .collect()
    }

    pub fn get_by_id(&self, id: &str) -> Result<ModelProvider> {
        let conn = self.db.connection();
        let provider = repository::find_by_id(conn, id)?.ok_or_else(|| not_found(id))?;
        with_model_types(conn, provider)
    }

    pub fn update(
        &mut self,
        id: &str,
        patch: UpdateModelProvider,
        user_id: &str,
    ) -> Result<ModelProvider> {
        patch.validate()?;

        let provider = self.db.unit_of_work(|tx| {
            let mut provider = owned_provider(tx, id, user_id)?;
            patch.apply(&mut provider);
            provider.config = provider.config.filter(|c| !c.is_null());
            provider.updater_id = Some(user_id.to_string());
            provider.update_time = Some(db::now());
            repository::update(tx, &provider)?;
            with_model_types(tx, provider)
        })?;

        info!(id = %id, user = %user_id, "updated model provider");
        Ok(provider)
    }

    pub fn delete(&mut self, id: &str, user_id: &str) -> Result<()> {
        self.db.unit_of_work(|tx| {
            owned_provider(tx, id, user_id)?;
            repository::soft_delete(tx, id, user_id, db::now().timestamp_millis())
        })?;

        info!(id = %id, user = %user_id, "deleted model provider");
        Ok(())
    }
}

fn with_model_types(
    conn: &rusqlite::Connection,
    mut provider: ModelProvider,
) -> Result<ModelProvider> {
    provider.model_types = provider_types(conn, &provider.id, &provider.creator_id)?;
    Ok(provider)
}

/// A live provider registered by `user_id`.
pub(crate) fn owned_provider(
    conn: &rusqlite::Connection,
    id: &str,
    user_id: &str,
) -> Result<ModelProvider> {
    let provider = repository::find_by_id(conn, id)?.ok_or_else(|| not_found(id))?;
    if provider.creator_id != user_id {
        return Err(KbError::AccessDenied {
            code: codes::MODEL_PROVIDER_ACCESS_DENIED,
            message: format!("no access to model provider '{}'", id),
        });
    }
    Ok(provider)
}

fn not_found(id: &str) -> KbError {
    KbError::NotFound {
        code: codes::MODEL_PROVIDER_NOT_FOUND,
        message: format!("model provider '{}' not found", id),
    }
}
