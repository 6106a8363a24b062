//! Model operations.

use super::repository;
use super::types::{CreateModel, Model, UpdateModel};
use crate::context::AppContext;
use crate::db::{self, Database};
use crate::error::{KbError, Result, codes};
use crate::provider::owned_provider;
use rusqlite::Connection;
use tracing::info;
use uuid::Uuid;

/// Model service bound to one database connection.
#[derive(Debug)]
pub struct ModelService {
    db: Database,
}

impl ModelService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Open the service against the data directory in `ctx`.
    pub fn open(ctx: &AppContext) -> Result<Self> {
        Ok(Self::new(Database::open(&ctx.db_path)?))
    }

    /// Add a model to one of `creator_id`'s providers.
    pub fn create(&mut self, payload: CreateModel, creator_id: &str) -> Result<Model> {
        payload.validate()?;

        let model = self.db.unit_of_work(|tx| {
            owned_provider(tx, &payload.provider_id, creator_id)?;

            let model = Model {
                id: Uuid::new_v4().to_string(),
                provider_id: payload.provider_id,
                name: payload.name,
                model_type: payload.model_type,
                context_length: payload.context_length,
                creator_id: creator_id.to_string(),
                create_time: db::now(),
                updater_id: None,
                update_time: None,
                deleted: false,
            };
            repository::insert(tx, &model)?;
            Ok(model)
        })?;

        info!(id = %model.id, provider = %model.provider_id, model_type = %model.model_type, "created model");
        Ok(model)
    }

    /// Live models of `creator_id`, newest first, optionally for one provider.
    pub fn list(&self, creator_id: &str, provider_id: Option<&str>) -> Result<Vec<Model>> {
        repository::list_by_creator(self.db.connection(), creator_id, provider_id)
    }

    pub fn get_by_id(&self, id: &str) -> Result<Model> {
        repository::find_by_id(self.db.connection(), id)?.ok_or_else(|| not_found(id))
    }

    pub fn update(&mut self, id: &str, patch: UpdateModel, user_id: &str) -> Result<Model> {
        patch.validate()?;

        let model = self.db.unit_of_work(|tx| {
            let mut model = owned_model(tx, id, user_id)?;
            if let Some(provider_id) = &patch.provider_id {
                owned_provider(tx, provider_id, user_id)?;
            }
            patch.apply(&mut model);
            model.updater_id = Some(user_id.to_string());
            model.update_time = Some(db::now());
            repository::update(tx, &model)?;
            Ok(model)
        })?;

        info!(id = %id, user = %user_id, "updated model");
        Ok(model)
    }

    pub fn delete(&mut self, id: &str, user_id: &str) -> Result<()> {
        self.db.unit_of_work(|tx| {
            owned_model(tx, id, user_id)?;
            repository::soft_delete(tx, id, user_id, db::now().timestamp_millis())
        })?;

        info!(id = %id, user = %user_id, "deleted model");
        Ok(())
    }
}

fn owned_model(conn: &Connection, id: &str, user_id: &str) -> Result<Model> {
    let model = repository::find_by_id(conn, id)?.ok_or_else(|| not_found(id))?;
    if model.creator_id != user_id {
        return Err(KbError::AccessDenied {
            code: codes::MODEL_ACCESS_DENIED,
            message: format!("no access to model '{}'", id),
        });
    }
    Ok(model)
}

fn not_found(id: &str) -> KbError {
    KbError::NotFound {
        code: codes::MODEL_NOT_FOUND,
        message: format!("model '{}' not found", id),
    }
}
