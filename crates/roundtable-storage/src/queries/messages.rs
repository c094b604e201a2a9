// SPDX-FileCopyrightText: 2026 Roundtable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message insert and retrieval.
//!
//! Messages are insert-only. Every insert bumps the owning debate's
//! `updated_at` so `list_debates` surfaces recently active debates first.

use roundtable_core::RoundtableError;
use rusqlite::params;

use crate::database::{map_tr_err, now_timestamp, Database};
use crate::models::Message;

/// Append a message and return its monotonic id.
pub async fn add_message(
    db: &Database,
    debate_id: &str,
    source: &str,
    content: &str,
    msg_type: &str,
) -> Result<i64, RoundtableError> {
    let debate_id = debate_id.to_string();
    let source = source.to_string();
    let content = content.to_string();
    let msg_type = msg_type.to_string();
    let now = now_timestamp();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO messages (debate_id, source, content, msg_type, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![debate_id, source, content, msg_type, now],
            )?;
            let id = conn.last_insert_rowid();
            conn.execute(
                "UPDATE debates SET updated_at = ?1 WHERE id = ?2",
                params![now, debate_id],
            )?;
            Ok(id)
        })
        .await
        .map_err(map_tr_err)
}

/// Get all messages for a debate in monotonic id order.
pub async fn get_messages(db: &Database, debate_id: &str) -> Result<Vec<Message>, RoundtableError> {
    let debate_id = debate_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, debate_id, source, content, msg_type, created_at
                 FROM messages WHERE debate_id = ?1 ORDER BY id",
            )?;
            let rows = stmt.query_map(params![debate_id], |row| {
                Ok(Message {
                    id: row.get(0)?,
                    debate_id: row.get(1)?,
                    source: row.get(2)?,
                    content: row.get(3)?,
                    msg_type: row.get(4)?,
                    created_at: row.get(5)?,
                })
            })?;
            let mut messages = Vec::new();
            for row in rows {
                messages.push(row?);
            }
            Ok(messages)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::debates::{create_debate, get_debate};
    use tempfile::tempdir;

    async fn setup_db_with_debate() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        create_debate(&db, "d1", "test debate", None).await.unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn add_and_get_messages_in_order() {
        let (db, _dir) = setup_db_with_debate().await;

        let id1 = add_message(&db, "d1", "user", "hello", "user").await.unwrap();
        let id2 = add_message(&db, "d1", "claude", "hi there", "model")
            .await
            .unwrap();
        let id3 = add_message(&db, "d1", "system", "all done", "system")
            .await
            .unwrap();
        assert!(id1 < id2 && id2 < id3);

        let messages = get_messages(&db, "d1").await.unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].source, "user");
        assert_eq!(messages[1].source, "claude");
        assert_eq!(messages[1].msg_type, "model");
        assert_eq!(messages[2].content, "all done");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn add_message_bumps_debate_updated_at() {
        let (db, _dir) = setup_db_with_debate().await;
        let before = get_debate(&db, "d1").await.unwrap().unwrap().updated_at;

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        add_message(&db, "d1", "user", "q", "user").await.unwrap();

        let after = get_debate(&db, "d1").await.unwrap().unwrap().updated_at;
        assert!(after > before, "expected {after} > {before}");
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn get_messages_empty_debate() {
        let (db, _dir) = setup_db_with_debate().await;
        assert!(get_messages(&db, "d1").await.unwrap().is_empty());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn multiline_content_round_trips() {
        let (db, _dir) = setup_db_with_debate().await;
        let content = "line one\nline two\n\nline four";
        add_message(&db, "d1", "gpt", content, "model").await.unwrap();
        let messages = get_messages(&db, "d1").await.unwrap();
        assert_eq!(messages[0].content, content);
        db.close().await.unwrap();
    }
}
