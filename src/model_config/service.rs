//! Model config operations.

use super::model::{CreateModelConfig, ModelConfig, UpdateModelConfig};
use super::repository;
use crate::context::AppContext;
use crate::db::{self, Database};
use crate::error::{KbError, Result, codes};
use crate::provider::owned_provider;
use rusqlite::Connection;
use tracing::{debug, info};
use uuid::Uuid;

/// Model config service bound to one database connection.
#[derive(Debug)]
pub struct ModelConfigService {
    db: Database,
}

impl ModelConfigService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Open the service against the data directory in `ctx`.
    pub fn open(ctx: &AppContext) -> Result<Self> {
        Ok(Self::new(Database::open(&ctx.db_path)?))
    }

    /// Store a config. Without a provider it becomes a global config.
    pub fn create(&mut self, payload: CreateModelConfig, creator_id: &str) -> Result<ModelConfig> {
        payload.validate()?;

        let config = self.db.unit_of_work(|tx| {
            if let Some(provider_id) = &payload.provider_id {
                owned_provider(tx, provider_id, creator_id)?;
            }

            let config = ModelConfig {
                id: Uuid::new_v4().to_string(),
                provider_id: payload.provider_id,
                temperature: payload.temperature,
                max_tokens: payload.max_tokens,
                top_p: payload.top_p,
                frequency_penalty: payload.frequency_penalty,
                presence_penalty: payload.presence_penalty,
                other_config: payload.other_config.filter(|c| !c.is_null()),
                creator_id: creator_id.to_string(),
                create_time: db::now(),
                updater_id: None,
                update_time: None,
                deleted: false,
            };
            repository::insert(tx, &config)?;
            Ok(config)
        })?;

        info!(id = %config.id, provider = ?config.provider_id, "created model config");
        Ok(config)
    }

    pub fn get_by_id(&self, id: &str) -> Result<ModelConfig> {
        repository::find_by_id(self.db.connection(), id)?.ok_or_else(|| not_found(id))
    }

    pub fn global_config(&self) -> Result<Option<ModelConfig>> {
        repository::find_latest(self.db.connection(), None)
    }

    pub fn provider_config(&self, provider_id: &str) -> Result<Option<ModelConfig>> {
        repository::find_latest(self.db.connection(), Some(provider_id))
    }

    /// The provider's own config, falling back to the global config.
    pub fn effective_config(&self, provider_id: Option<&str>) -> Result<Option<ModelConfig>> {
        if let Some(provider_id) = provider_id {
            if let Some(config) = self.provider_config(provider_id)? {
                return Ok(Some(config));
            }
            debug!(provider = %provider_id, "no provider config, using global config");
        }
        self.global_config()
    }

    pub fn update(
        &mut self,
        id: &str,
        patch: UpdateModelConfig,
        user_id: &str,
    ) -> Result<ModelConfig> {
        patch.validate()?;

        let config = self.db.unit_of_work(|tx| {
            let mut config = owned_config(tx, id, user_id)?;
            if let Some(Some(provider_id)) = &patch.provider_id {
                owned_provider(tx, provider_id, user_id)?;
            }
            patch.apply(&mut config);
            config.updater_id = Some(user_id.to_string());
            config.update_time = Some(db::now());
            repository::update(tx, &config)?;
            Ok(config)
        })?;

        info!(id = %id, user = %user_id, "updated model config");
        Ok(config)
    }

    pub fn delete(&mut self, id: &str, user_id: &str) -> Result<()> {
        self.db.unit_of_work(|tx| {
            owned_config(tx, id, user_id)?;
            repository::soft_delete(tx, id, user_id, db::now().timestamp_millis())
        })?;

        info!(id = %id, user = %user_id, "deleted model config");
        Ok(())
    }
}

fn owned_config(conn: &Connection, id: &str, user_id: &str) -> Result<ModelConfig> {
    let config = repository::find_by_id(conn, id)?.ok_or_else(|| not_found(id))?;
    if config.creator_id != user_id {
        return Err(KbError::AccessDenied {
            code: codes::MODEL_CONFIG_ACCESS_DENIED,
            message: format!("no access to model config '{}'", id),
        });
    }
    Ok(config)
}

fn not_found(id: &str) -> KbError {
    KbError::NotFound {
        code: codes::MODEL_CONFIG_NOT_FOUND,
        message: format!("model config '{}' not found", id),
    }
}
