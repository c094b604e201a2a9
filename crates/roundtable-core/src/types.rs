// SPDX-FileCopyrightText: 2026 Roundtable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared across the Roundtable workspace.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// A piece of a streaming backend response.
///
/// Every `send` call produces a finite sequence of chunks ending in exactly
/// one terminal chunk: either `done = true` (possibly carrying final
/// aggregated text) or `error != None`. Concatenating the `text` fields in
/// order reconstructs the full reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Chunk {
    /// Incremental response text. May be empty.
    pub text: Option<String>,
    /// True on the terminal chunk of a successful stream.
    pub done: bool,
    /// Error description on the terminal chunk of a failed stream.
    pub error: Option<String>,
    /// Distinguishes a deadline expiry from other failures.
    pub is_timeout: bool,
}

impl Chunk {
    /// A text chunk.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    /// A successful terminal chunk with no trailing text.
    pub fn done() -> Self {
        Self {
            done: true,
            ..Self::default()
        }
    }

    /// A successful terminal chunk carrying the final aggregated text.
    pub fn done_with(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            done: true,
            ..Self::default()
        }
    }

    /// A failed terminal chunk.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }

    /// A failed terminal chunk caused by a deadline expiry.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            is_timeout: true,
            ..Self::default()
        }
    }

    /// Whether this chunk terminates the stream.
    pub fn is_terminal(&self) -> bool {
        self.done || self.error.is_some()
    }
}

/// The kind of a transcript message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    User,
    Model,
    System,
    Tool,
    Meta,
}

/// A single message in a debate transcript.
///
/// `source` is `"user"`, `"system"`, or a backend id (`"claude"`, `"gpt"`,
/// ...). The same type serves as conversation history handed to backends
/// and as the in-memory mirror of persisted messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptMessage {
    pub source: String,
    pub content: String,
    pub kind: MessageKind,
    pub created_at: DateTime<Utc>,
    /// True when this message records a backend failure.
    #[serde(default)]
    pub is_error: bool,
    /// True when the recorded failure was a deadline expiry.
    #[serde(default)]
    pub is_timeout: bool,
}

impl TranscriptMessage {
    pub fn new(source: impl Into<String>, content: impl Into<String>, kind: MessageKind) -> Self {
        Self {
            source: source.into(),
            content: content.into(),
            kind,
            created_at: Utc::now(),
            is_error: false,
            is_timeout: false,
        }
    }

    /// A message from the human operator.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content, MessageKind::User)
    }

    /// A status or summary message from Roundtable itself.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new("system", content, MessageKind::System)
    }

    /// A (possibly still streaming) reply from a backend.
    pub fn model(source: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(source, content, MessageKind::Model)
    }
}

/// The current state of one backend within a debate.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ModelStatus {
    #[default]
    Idle,
    Responding,
    Waiting,
    Error,
    Timeout,
}

/// Lifecycle state of a debate.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DebateStatus {
    #[default]
    Active,
    Resolved,
    Abandoned,
}

/// Display information and capability flags for a backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendInfo {
    /// Stable identifier used as the message source ("claude", "gpt", ...).
    pub id: String,
    /// Human-readable display name.
    pub name: String,
    /// Hex color for UI rendering.
    pub color: String,
    /// Whether this backend may act as the executor.
    pub can_exec: bool,
    /// Whether this backend may consume context files.
    pub can_read: bool,
}
