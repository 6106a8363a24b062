//! SQL access for the `model` table.

use super::types::{Model, ModelType};
use crate::db::from_millis;
use crate::error::{KbError, Result};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};

const COLUMNS: &str = "id, provider_id, name, model_type, context_length, \
                       creator_id, create_time_ms, updater_id, update_time_ms, deleted";

pub(crate) fn insert(conn: &Connection, model: &Model) -> Result<()> {
    conn.execute(
        "INSERT INTO model (id, provider_id, name, model_type, context_length, creator_id,
                            create_time_ms, updater_id, update_time_ms, deleted)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            model.id,
            model.provider_id,
            model.name,
            model.model_type.as_str(),
            model.context_length,
            model.creator_id,
            model.create_time.timestamp_millis(),
            model.updater_id,
            model.update_time.map(|t| t.timestamp_millis()),
            model.deleted,
        ],
    )?;
    Ok(())
}

pub(crate) fn find_by_id(conn: &Connection, id: &str) -> Result<Option<Model>> {
    let sql = format!("SELECT {} FROM model WHERE id = ?1 AND deleted = 0", COLUMNS);
    conn.query_row(&sql, params![id], model_from_row)
        .optional()
        .map_err(KbError::from)
}

/// Live models of `creator_id`, newest first, optionally for one provider.
pub(crate) fn list_by_creator(
    conn: &Connection,
    creator_id: &str,
    provider_id: Option<&str>,
) -> Result<Vec<Model>> {
    let sql = format!(
        "SELECT {} FROM model
         WHERE creator_id = ?1 AND deleted = 0 AND (?2 IS NULL OR provider_id = ?2)
         ORDER BY create_time_ms DESC",
        COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![creator_id, provider_id], model_from_row)?;
    rows.collect::<std::result::Result<Vec<_>, _>>()
        .map_err(KbError::from)
}

/// Distinct types among the live models `creator_id` added to a provider.
pub(crate) fn provider_types(
    conn: &Connection,
    provider_id: &str,
    creator_id: &str,
) -> Result<Vec<ModelType>> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT model_type FROM model
         WHERE provider_id = ?1 AND creator_id = ?2 AND deleted = 0",
    )?;
    let names = stmt
        .query_map(params![provider_id, creator_id], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut types: Vec<ModelType> = names
        .iter()
        .filter_map(|name| ModelType::from_str(name))
        .collect();
    types.sort();
    Ok(types)
}

pub(crate) fn update(conn: &Connection, model: &Model) -> Result<()> {
    conn.execute(
        "UPDATE model
         SET provider_id = ?2, name = ?3, model_type = ?4, context_length = ?5,
             updater_id = ?6, update_time_ms = ?7
         WHERE id = ?1",
        params![
            model.id,
            model.provider_id,
            model.name,
            model.model_type.as_str(),
            model.context_length,
            model.updater_id,
            model.update_time.map(|t| t.timestamp_millis()),
        ],
    )?;
    Ok(())
}

pub(crate) fn soft_delete(conn: &Connection, id: &str, user_id: &str, now_ms: i64) -> Result<()> {
    conn.execute(
        "UPDATE model SET deleted = 1, updater_id = ?2, update_time_ms = ?3 WHERE id = ?1",
        params![id, user_id, now_ms],
    )?;
    Ok(())
}

fn model_from_row(row: &Row<'_>) -> rusqlite::Result<Model> {
    let model_type: String = row.get(3)?;
    let model_type = ModelType::from_str(&model_type).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            Type::Text,
            format!("unknown model type '{}'", model_type).into(),
        )
    })?;

    Ok(Model {
        id: row.get(0)?,
        provider_id: row.get(1)?,
        name: row.get(2)?,
        model_type,
        context_length: row.get(4)?,
        creator_id: row.get(5)?,
        create_time: from_millis(row.get(6)?),
        updater_id: row.get(7)?,
        update_time: row.get::<_, Option<i64>>(8)?.map(from_millis),
        deleted: row.get(9)?,
    })
}
