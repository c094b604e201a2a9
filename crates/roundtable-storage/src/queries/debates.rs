// SPDX-FileCopyrightText: 2026 Roundtable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Debate CRUD operations.

use roundtable_core::RoundtableError;
use rusqlite::params;

use crate::database::{map_tr_err, now_timestamp, Database};
use crate::models::Debate;

fn row_to_debate(row: &rusqlite::Row<'_>) -> rusqlite::Result<Debate> {
    Ok(Debate {
        id: row.get(0)?,
        name: row.get(1)?,
        project_path: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
        status: row.get(5)?,
        consensus: row.get(6)?,
    })
}

const DEBATE_COLUMNS: &str = "id, name, project_path, created_at, updated_at, status, consensus";

/// Create a new debate in `active` status.
pub async fn create_debate(
    db: &Database,
    id: &str,
    name: &str,
    project_path: Option<&str>,
) -> Result<(), RoundtableError> {
    let id = id.to_string();
    let name = name.to_string();
    let project_path = project_path.map(str::to_string);
    let now = now_timestamp();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO debates (id, name, project_path, created_at, updated_at, status)
                 VALUES (?1, ?2, ?3, ?4, ?4, 'active')",
                params![id, name, project_path, now],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Get a debate by ID.
pub async fn get_debate(db: &Database, id: &str) -> Result<Option<Debate>, RoundtableError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {DEBATE_COLUMNS} FROM debates WHERE id = ?1"
            ))?;
            let result = stmt.query_row(params![id], row_to_debate);
            match result {
                Ok(debate) => Ok(Some(debate)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// List all debates, most recently updated first.
pub async fn list_debates(db: &Database) -> Result<Vec<Debate>, RoundtableError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {DEBATE_COLUMNS} FROM debates ORDER BY updated_at DESC"
            ))?;
            let rows = stmt.query_map([], row_to_debate)?;
            let mut debates = Vec::new();
            for row in rows {
                debates.push(row?);
            }
            Ok(debates)
        })
        .await
        .map_err(map_tr_err)
}

/// Update a debate's status and consensus text.
pub async fn update_debate_status(
    db: &Database,
    id: &str,
    status: &str,
    consensus: Option<&str>,
) -> Result<(), RoundtableError> {
    let id = id.to_string();
    let status = status.to_string();
    let consensus = consensus.map(str::to_string);
    let now = now_timestamp();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE debates SET status = ?1, consensus = ?2, updated_at = ?3 WHERE id = ?4",
                params![status, consensus, now, id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Rename a debate.
pub async fn update_debate_name(
    db: &Database,
    id: &str,
    name: &str,
) -> Result<(), RoundtableError> {
    let id = id.to_string();
    let name = name.to_string();
    let now = now_timestamp();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE debates SET name = ?1, updated_at = ?2 WHERE id = ?3",
                params![name, now, id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
