//! SQL access for the `model_provider` table.

use super::model::{ModelProvider, Platform};
use crate::db::from_millis;
use crate::error::{KbError, Result};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde_json::Value;

const COLUMNS: &str = "id, platform, api_key, api_base_url, description, config_json, \
                       creator_id, create_time_ms, updater_id, update_time_ms, deleted";

pub(crate) fn insert(conn: &Connection, provider: &ModelProvider) -> Result<()> {
    conn.execute(
        "INSERT INTO model_provider (id, platform, api_key, api_base_url, description,
                                     config_json, creator_id, create_time_ms, updater_id,
                                     update_time_ms, deleted)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            provider.id,
            provider.platform.as_str(),
            provider.api_key,
            provider.api_base_url,
            provider.description,
            config_to_text(provider.config.as_ref())?,
            provider.creator_id,
            provider.create_time.timestamp_millis(),
            provider.updater_id,
            provider.update_time.map(|t| t.timestamp_millis()),
            provider.deleted,
        ],
    )?;
    Ok(())
}

/// Whether `creator_id` already has a live provider on `platform`.
pub(crate) fn platform_exists(
    conn: &Connection,
    platform: Platform,
    creator_id: &str,
) -> Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM model_provider
                       WHERE platform = ?1 AND creator_id = ?2 AND deleted = 0)",
        params![platform.as_str(), creator_id],
        |row| row.get(0),
    )
    .map_err(KbError::from)
}

pub(crate) fn find_by_id(conn: &Connection, id: &str) -> Result<Option<ModelProvider>> {
    let sql = format!(
        "SELECT {} FROM model_provider WHERE id = ?1 AND deleted = 0",
        COLUMNS
    );
    conn.query_row(&sql, params![id], provider_from_row)
        .optional()
        .map_err(KbError::from)
}

pub(crate) fn list_by_creator(conn: &Connection, creator_id: &str) -> Result<Vec<ModelProvider>> {
    let sql = format!(
        "SELECT {} FROM model_provider WHERE creator_id = ?1 AND deleted = 0
         ORDER BY update_time_ms DESC, create_time_ms DESC",
        COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![creator_id], provider_from_row)?;
    rows.collect::<std::result::Result<Vec<_>, _>>()
        .map_err(KbError::from)
}

pub(crate) fn update(conn: &Connection, provider: &ModelProvider) -> Result<()> {
    conn.execute(
        "UPDATE model_provider
         SET api_key = ?2, api_base_url = ?3, description = ?4, config_json = ?5,
             updater_id = ?6, update_time_ms = ?7
         WHERE id = ?1",
        params![
            provider.id,
            provider.api_key,
            provider.api_base_url,
            provider.description,
            config_to_text(provider.config.as_ref())?,
            provider.updater_id,
            provider.update_time.map(|t| t.timestamp_millis()),
        ],
    )?;
    Ok(())
}

pub(crate) fn soft_delete(conn: &Connection, id: &str, user_id: &str, now_ms: i64) -> Result<()> {
    conn.execute(
        "UPDATE model_provider SET deleted = 1, updater_id = ?2, update_time_ms = ?3
         WHERE id = ?1",
        params![id, user_id, now_ms],
    )?;
    Ok(())
}

fn config_to_text(config: Option<&Value>) -> Result<Option<String>> {
    match config {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::to_string(value).map(Some).map_err(|e| {
            KbError::StoreError(format!("failed to serialize provider config: {}", e))
        }),
    }
}

fn provider_from_row(row: &Row<'_>) -> rusqlite::Result<ModelProvider> {
    let platform: String = row.get(1)?;
    let platform = Platform::from_str(&platform).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            1,
            Type::Text,
            format!("unknown platform '{}'", platform).into(),
        )
    })?;

    let config = match row.get::<_, Option<String>>(5)? {
        Some(text) => Some(serde_json::from_str(&text).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e))
        })?),
        None => None,
    };

    Ok(ModelProvider {
        id: row.get(0)?,
        platform,
        api_key: row.get(2)?,
        api_base_url: row.get(3)?,
        description: row.get(4)?,
        config,
        model_types: Vec::new(),
        creator_id: row.get(6)?,
        create_time: from_millis(row.get(7)?),
        updater_id: row.get(8)?,
        update_time: row.get::<_, Option<i64>>(9)?.map(from_millis),
        deleted: row.get(10)?,
    })
}
