// SPDX-FileCopyrightText: 2026 Roundtable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-debate model status snapshots.

use roundtable_core::RoundtableError;
use rusqlite::params;

use crate::database::{map_tr_err, Database};
use crate::models::ModelState;

/// Insert or update a model's status within a debate.
pub async fn upsert_model_state(
    db: &Database,
    debate_id: &str,
    model_id: &str,
    status: &str,
    last_seen_msg: Option<i64>,
) -> Result<(), RoundtableError> {
    let debate_id = debate_id.to_string();
    let model_id = model_id.to_string();
    let status = status.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO model_state (debate_id, model_id, last_seen_msg, status)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (debate_id, model_id) DO UPDATE SET
                     last_seen_msg = COALESCE(excluded.last_seen_msg, model_state.last_seen_msg),
                     status = excluded.status",
                params![debate_id, model_id, last_seen_msg, status],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Get all model states for a debate.
pub async fn get_model_states(
    db: &Database,
    debate_id: &str,
) -> Result<Vec<ModelState>, RoundtableError> {
    let debate_id = debate_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT debate_id, model_id, last_seen_msg, status
                 FROM model_state WHERE debate_id = ?1 ORDER BY model_id",
            )?;
            let rows = stmt.query_map(params![debate_id], |row| {
                Ok(ModelState {
                    debate_id: row.get(0)?,
                    model_id: row.get(1)?,
                    last_seen_msg: row.get(2)?,
                    status: row.get(3)?,
                })
            })?;
            let mut states = Vec::new();
            for row in rows {
                states.push(row?);
            }
            Ok(states)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::debates::create_debate;
    use tempfile::tempdir;

    async fn setup_db_with_debate() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        create_debate(&db, "d1", "test", None).await.unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn upsert_creates_then_updates() {
        let (db, _dir) = setup_db_with_debate().await;
        upsert_model_state(&db, "d1", "claude", "responding", None)
            .await
            .unwrap();
        upsert_model_state(&db, "d1", "claude", "idle", Some(7))
            .await
            .unwrap();

        let states = get_model_states(&db, "d1").await.unwrap();
        assert_eq!(states.len(), 1);
        assert_eq!(states[0].status, "idle");
        assert_eq!(states[0].last_seen_msg, Some(7));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn upsert_preserves_last_seen_when_none() {
        let (db, _dir) = setup_db_with_debate().await;
        upsert_model_state(&db, "d1", "gpt", "idle", Some(3)).await.unwrap();
        upsert_model_state(&db, "d1", "gpt", "error", None).await.unwrap();

        let states = get_model_states(&db, "d1").await.unwrap();
        assert_eq!(states[0].status, "error");
        assert_eq!(states[0].last_seen_msg, Some(3));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn states_are_per_model() {
        let (db, _dir) = setup_db_with_debate().await;
        upsert_model_state(&db, "d1", "claude", "idle", None).await.unwrap();
        upsert_model_state(&db, "d1", "gpt", "timeout", None).await.unwrap();

        let states = get_model_states(&db, "d1").await.unwrap();
        assert_eq!(states.len(), 2);
        assert_eq!(states[0].model_id, "claude");
        assert_eq!(states[1].model_id, "gpt");
        assert_eq!(states[1].status, "timeout");
        db.close().await.unwrap();
    }
}
