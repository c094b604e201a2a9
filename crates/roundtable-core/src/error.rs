// SPDX-FileCopyrightText: 2026 Roundtable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Roundtable debate orchestrator.

use thiserror::Error;

/// The primary error type used across all Roundtable crates.
///
/// Backend transport failures that occur mid-stream are NOT represented
/// here: per the streaming contract they travel as data on the chunk
/// stream (`Chunk::error` / `Chunk::is_timeout`), so that a failing
/// backend can never abort the debate for the others.
#[derive(Debug, Error)]
pub enum RoundtableError {
    /// Configuration errors (invalid TOML, missing required fields, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database open, query failure, migration).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Backend setup errors raised before a stream exists (bad API key
    /// header, unusable CLI path). Never used for mid-stream failures.
    #[error("backend error: {message}")]
    Backend {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Context-file loading rejected the path or content.
    #[error("context file error: {0}")]
    ContextFile(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}
