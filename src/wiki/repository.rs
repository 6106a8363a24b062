//! SQL access for the `wiki_repo` table.
//!
//! Functions take a plain [`Connection`]; inside a unit of work pass the
//! transaction, which derefs to one.

use super::model::WikiRepo;
use crate::db::from_millis;
use crate::error::{KbError, Result};
use rusqlite::{Connection, OptionalExtension, Row, params};

const COLUMNS: &str = "id, name, path, description, cover, embedding_model_id, rerank_model_id, \
                       creator_id, create_time_ms, updater_id, update_time_ms, deleted";

pub(crate) fn insert(conn: &Connection, repo: &WikiRepo) -> Result<()> {
    conn.execute(
        "INSERT INTO wiki_repo (id, name, path, description, cover, embedding_model_id,
                                rerank_model_id, creator_id, create_time_ms, updater_id,
                                update_time_ms, deleted)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            repo.id,
            repo.name,
            repo.path,
            repo.description,
            repo.cover,
            repo.embedding_model_id,
            repo.rerank_model_id,
            repo.creator_id,
            repo.create_time.timestamp_millis(),
            repo.updater_id,
            repo.update_time.map(|t| t.timestamp_millis()),
            repo.deleted,
        ],
    )?;
    Ok(())
}

/// Whether a live repo already uses `path`.
pub(crate) fn path_exists(conn: &Connection, path: &str) -> Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM wiki_repo WHERE path = ?1 AND deleted = 0)",
        params![path],
        |row| row.get(0),
    )
    .map_err(KbError::from)
}

pub(crate) fn find_by_id(conn: &Connection, id: &str) -> Result<Option<WikiRepo>> {
    let sql = format!(
        "SELECT {} FROM wiki_repo WHERE id = ?1 AND deleted = 0",
        COLUMNS
    );
    conn.query_row(&sql, params![id], repo_from_row)
        .optional()
        .map_err(KbError::from)
}

pub(crate) fn find_by_path(conn: &Connection, path: &str) -> Result<Option<WikiRepo>> {
    let sql = format!(
        "SELECT {} FROM wiki_repo WHERE path = ?1 AND deleted = 0
         ORDER BY create_time_ms LIMIT 1",
        COLUMNS
    );
    conn.query_row(&sql, params![path], repo_from_row)
        .optional()
        .map_err(KbError::from)
}

/// Live repos created by `creator_id`, most recently touched first.
pub(crate) fn list_by_creator(conn: &Connection, creator_id: &str) -> Result<Vec<WikiRepo>> {
    let sql = format!(
        "SELECT {} FROM wiki_repo WHERE creator_id = ?1 AND deleted = 0
         ORDER BY update_time_ms DESC, create_time_ms DESC",
        COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![creator_id], repo_from_row)?;
    rows.collect::<std::result::Result<Vec<_>, _>>()
        .map_err(KbError::from)
}

/// Write back the mutable columns of `repo`.
pub(crate) fn update(conn: &Connection, repo: &WikiRepo) -> Result<()> {
    conn.execute(
        "UPDATE wiki_repo
         SET name = ?2, description = ?3, cover = ?4, embedding_model_id = ?5,
             rerank_model_id = ?6, updater_id = ?7, update_time_ms = ?8
         WHERE id = ?1",
        params![
            repo.id,
            repo.name,
            repo.description,
            repo.cover,
            repo.embedding_model_id,
            repo.rerank_model_id,
            repo.updater_id,
            repo.update_time.map(|t| t.timestamp_millis()),
        ],
    )?;
    Ok(())
}

pub(crate) fn soft_delete(conn: &Connection, id: &str, user_id: &str, now_ms: i64) -> Result<()> {
    conn.execute(
        "UPDATE wiki_repo SET deleted = 1, updater_id = ?2, update_time_ms = ?3 WHERE id = ?1",
        params![id, user_id, now_ms],
    )?;
    Ok(())
}

fn repo_from_row(row: &Row<'_>) -> rusqlite::Result<WikiRepo> {
    Ok(WikiRepo {
        id: row.get(0)?,
        name: row.get(1)?,
        path: row.get(2)?,
        description: row.get(3)?,
        cover: row.get(4)?,
        embedding_model_id: row.get(5)?,
        rerank_model_id: row.get(6)?,
        creator_id: row.get(7)?,
        create_time: from_millis(row.get(8)?),
        updater_id: row.get(9)?,
        update_time: row.get::<_, Option<i64>>(10)?.map(from_millis),
        deleted: row.get(11)?,
    })
}
