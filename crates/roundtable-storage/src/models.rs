// SPDX-FileCopyrightText: 2026 Roundtable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain model types for storage entities.
//!
//! These types represent the rows stored in the SQLite database. Timestamps
//! are ISO 8601 strings as written by `database::now_timestamp`.

use serde::{Deserialize, Serialize};

/// A debate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Debate {
    /// Short opaque unique identifier.
    pub id: String,
    /// Mutable display label.
    pub name: String,
    /// Project directory this debate is about, if any.
    pub project_path: Option<String>,
    /// ISO 8601 creation timestamp.
    pub created_at: String,
    /// ISO 8601 last-update timestamp, bumped on every message.
    pub updated_at: String,
    /// Lifecycle status: "active", "resolved", "abandoned".
    pub status: String,
    /// Consensus description once resolved.
    pub consensus: Option<String>,
}

/// A single message within a debate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Monotonic identifier (SQLite AUTOINCREMENT).
    pub id: i64,
    /// Debate this message belongs to.
    pub debate_id: String,
    /// "user", "system", or a backend id ("claude", "gpt", ...).
    pub source: String,
    /// Complete, possibly multi-line content.
    pub content: String,
    /// "user", "model", "system", "tool", or "meta".
    pub msg_type: String,
    /// ISO 8601 creation timestamp.
    pub created_at: String,
}

/// A file shared into a debate's context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextFile {
    pub id: i64,
    pub debate_id: String,
    /// Absolute, validated path.
    pub path: String,
    pub content: String,
    /// ISO 8601 timestamp.
    pub added_at: String,
}

/// Per-debate, per-model status snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelState {
    pub debate_id: String,
    pub model_id: String,
    /// Last message id this model has seen, if tracked.
    pub last_seen_msg: Option<i64>,
    /// "idle", "responding", "waiting", "error", "timeout".
    pub status: String,
}
