// SPDX-FileCopyrightText: 2026 Roundtable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Context file operations.
//!
//! At most one entry per (debate_id, path): re-adding a path replaces its
//! content via upsert.

use roundtable_core::RoundtableError;
use rusqlite::params;

use crate::database::{map_tr_err, now_timestamp, Database};
use crate::models::ContextFile;

/// Add (or replace) a file in the debate's shared context.
pub async fn add_context_file(
    db: &Database,
    debate_id: &str,
    path: &str,
    content: &str,
) -> Result<(), RoundtableError> {
    let debate_id = debate_id.to_string();
    let path = path.to_string();
    let content = content.to_string();
    let now = now_timestamp();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO context_files (debate_id, path, content, added_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (debate_id, path) DO UPDATE SET
                     content = excluded.content,
                     added_at = excluded.added_at",
                params![debate_id, path, content, now],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Remove a file from the debate's shared context.
pub async fn remove_context_file(
    db: &Database,
    debate_id: &str,
    path: &str,
) -> Result<(), RoundtableError> {
    let debate_id = debate_id.to_string();
    let path = path.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "DELETE FROM context_files WHERE debate_id = ?1 AND path = ?2",
                params![debate_id, path],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Get all context files for a debate in the order they were added.
pub async fn get_context_files(
    db: &Database,
    debate_id: &str,
) -> Result<Vec<ContextFile>, RoundtableError> {
    let debate_id = debate_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, debate_id, path, content, added_at
                 FROM context_files WHERE debate_id = ?1 ORDER BY added_at, id",
            )?;
            let rows = stmt.query_map(params![debate_id], |row| {
                Ok(ContextFile {
                    id: row.get(0)?,
                    debate_id: row.get(1)?,
                    path: row.get(2)?,
                    content: row.get(3)?,
                    added_at: row.get(4)?,
                })
            })?;
            let mut files = Vec::new();
            for row in rows {
                files.push(row?);
            }
            Ok(files)
        })
        .await
        .map_err(map_tr_err)
}
