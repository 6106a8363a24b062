//! SQL access for the `model_config` table.

use super::model::ModelConfig;
use crate::db::from_millis;
use crate::error::{KbError, Result};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde_json::Value;

const COLUMNS: &str = "id, provider_id, temperature, max_tokens, top_p, frequency_penalty, \
                       presence_penalty, other_config_json, creator_id, create_time_ms, \
                       updater_id, update_time_ms, deleted";

pub(crate) fn insert(conn: &Connection, config: &ModelConfig) -> Result<()> {
    conn.execute(
        "INSERT INTO model_config (id, provider_id, temperature, max_tokens, top_p,
                                   frequency_penalty, presence_penalty, other_config_json,
                                   creator_id, create_time_ms, updater_id, update_time_ms,
                                   deleted)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            config.id,
            config.provider_id,
            config.temperature,
            config.max_tokens,
            config.top_p,
            config.frequency_penalty,
            config.presence_penalty,
            other_to_text(config.other_config.as_ref())?,
            config.creator_id,
            config.create_time.timestamp_millis(),
            config.updater_id,
            config.update_time.map(|t| t.timestamp_millis()),
            config.deleted,
        ],
    )?;
    Ok(())
}

pub(crate) fn find_by_id(conn: &Connection, id: &str) -> Result<Option<ModelConfig>> {
    let sql = format!("SELECT {} FROM model_config WHERE id = ?1 AND deleted = 0", COLUMNS);
    conn.query_row(&sql, params![id], config_from_row)
        .optional()
        .map_err(KbError::from)
}

/// The preferred live config for `provider_id`, or the global one when
/// `provider_id` is `None`. Updated rows come first, newest update first,
/// then never-updated rows by creation time.
pub(crate) fn find_latest(
    conn: &Connection,
    provider_id: Option<&str>,
) -> Result<Option<ModelConfig>> {
    let sql = format!(
        "SELECT {} FROM model_config
         WHERE provider_id IS ?1 AND deleted = 0
         ORDER BY update_time_ms DESC, create_time_ms DESC
         LIMIT 1",
        COLUMNS
    );
    conn.query_row(&sql, params![provider_id], config_from_row)
        .optional()
        .map_err(KbError::from)
}

pub(crate) fn update(conn: &Connection, config: &ModelConfig) -> Result<()> {
    conn.execute(
        "UPDATE model_config
         SET provider_id = ?2, temperature = ?3, max_tokens = ?4, top_p = ?5,
             frequency_penalty = ?6, presence_penalty = ?7, other_config_json = ?8,
             updater_id = ?9, update_time_ms = ?10
         WHERE id = ?1",
        params![
            config.id,
            config.provider_id,
            config.temperature,
            config.max_tokens,
            config.top_p,
            config.frequency_penalty,
            config.presence_penalty,
            other_to_text(config.other_config.as_ref())?,
            config.updater_id,
            config.update_time.map(|t| t.timestamp_millis()),
        ],
    )?;
    Ok(())
}

pub(crate) fn soft_delete(conn: &Connection, id: &str, user_id: &str, now_ms: i64) -> Result<()> {
    conn.execute(
        "UPDATE model_config SET deleted = 1, updater_id = ?2, update_time_ms = ?3
         WHERE id = ?1",
        params![id, user_id, now_ms],
    )?;
    Ok(())
}

fn other_to_text(other: Option<&Value>) -> Result<Option<String>> {
    match other {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::to_string(value).map(Some).map_err(|e| {
            KbError::StoreError(format!("failed to serialize model config: {}", e))
        }),
    }
}

fn config_from_row(row: &Row<'_>) -> rusqlite::Result<ModelConfig> {
    let other_config = match row.get::<_, Option<String>>(7)? {
        Some(text) => Some(serde_json::from_str(&text).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(7, Type::Text, Box::new(e))
        })?),
        None => None,
    };

    Ok(ModelConfig {
        id: row.get(0)?,
        provider_id: row.get(1)?,
        temperature: row.get(2)?,
        max_tokens: row.get(3)?,
        top_p: row.get(4)?,
        frequency_penalty: row.get(5)?,
        presence_penalty: row.get(6)?,
        other_config,
        creator_id: row.get(8)?,
        create_time: from_millis(row.get(9)?),
        updater_id: row.get(10)?,
        update_time: row.get::<_, Option<i64>>(11)?.map(from_millis),
        deleted: row.get(12)?,
    })
}
