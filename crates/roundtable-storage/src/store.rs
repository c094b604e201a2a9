// SPDX-FileCopyrightText: 2026 Roundtable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The debate store facade.
//!
//! Wraps a [`Database`] handle and delegates all query operations to the
//! typed query modules. One `DebateStore` per process; clones of the
//! surrounding `Arc` share the single writer connection.

use roundtable_core::RoundtableError;
use tracing::debug;

use crate::database::Database;
use crate::models::{ContextFile, Debate, Message, ModelState};
use crate::queries;

/// Durable store for debates, messages, context files, and model state.
pub struct DebateStore {
    db: Database,
}

impl DebateStore {
    /// Opens the store at `path`, running migrations as needed.
    pub async fn open(path: &str) -> Result<Self, RoundtableError> {
        let db = Database::open(path).await?;
        debug!(path, "debate store opened");
        Ok(Self { db })
    }

    /// Checkpoints the WAL and closes the store.
    pub async fn close(self) -> Result<(), RoundtableError> {
        self.db.close().await
    }

    // --- Debate operations ---

    pub async fn create_debate(
        &self,
        id: &str,
        name: &str,
        project_path: Option<&str>,
    ) -> Result<(), RoundtableError> {
        queries::debates::create_debate(&self.db, id, name, project_path).await
    }

    pub async fn get_debate(&self, id: &str) -> Result<Option<Debate>, RoundtableError> {
        queries::debates::get_debate(&self.db, id).await
    }

    pub async fn list_debates(&self) -> Result<Vec<Debate>, RoundtableError> {
        queries::debates::list_debates(&self.db).await
    }

    pub async fn update_debate_status(
        &self,
        id: &str,
        status: &str,
        consensus: Option<&str>,
    ) -> Result<(), RoundtableError> {
        queries::debates::update_debate_status(&self.db, id, status, consensus).await
    }

    pub async fn update_debate_name(&self, id: &str, name: &str) -> Result<(), RoundtableError> {
        queries::debates::update_debate_name(&self.db, id, name).await
    }

    // --- Message operations ---

    pub async fn add_message(
        &self,
        debate_id: &str,
        source: &str,
        content: &str,
        msg_type: &str,
    ) -> Result<i64, RoundtableError> {
        queries::messages::add_message(&self.db, debate_id, source, content, msg_type).await
    }

    pub async fn get_messages(&self, debate_id: &str) -> Result<Vec<Message>, RoundtableError> {
        queries::messages::get_messages(&self.db, debate_id).await
    }

    // --- Context file operations ---

    pub async fn add_context_file(
        &self,
        debate_id: &str,
        path: &str,
        content: &str,
    ) -> Result<(), RoundtableError> {
        queries::context_files::add_context_file(&self.db, debate_id, path, content).await
    }

    pub async fn remove_context_file(
        &self,
        debate_id: &str,
        path: &str,
    ) -> Result<(), RoundtableError> {
        queries::context_files::remove_context_file(&self.db, debate_id, path).await
    }

    pub async fn get_context_files(
        &self,
        debate_id: &str,
    ) -> Result<Vec<ContextFile>, RoundtableError> {
        queries::context_files::get_context_files(&self.db, debate_id).await
    }

    // --- Model state operations ---

    pub async fn upsert_model_state(
        &self,
        debate_id: &str,
        model_id: &str,
        status: &str,
        last_seen_msg: Option<i64>,
    ) -> Result<(), RoundtableError> {
        queries::model_state::upsert_model_state(&self.db, debate_id, model_id, status, last_seen_msg)
            .await
    }

    pub async fn get_model_states(
        &self,
        debate_id: &str,
    ) -> Result<Vec<ModelState>, RoundtableError> {
        queries::model_state::get_model_states(&self.db, debate_id).await
    }
}
