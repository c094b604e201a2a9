// SPDX-FileCopyrightText: 2026 Roundtable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Roundtable debate orchestrator.
//!
//! This crate provides the foundational trait definition, error type, and
//! common types used throughout the Roundtable workspace. All backend
//! adapters implement [`Backend`]; all crates share [`RoundtableError`].

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::RoundtableError;
pub use traits::{Backend, BackendState, ChunkStream, StatusHandle};
pub use types::{
    BackendInfo, Chunk, DebateStatus, MessageKind, ModelStatus, TranscriptMessage,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtable_error_has_all_variants() {
        let _config = RoundtableError::Config("test".into());
        let _storage = RoundtableError::Storage {
            source: Box::new(std::io::Error::other("test")),
        };
        let _backend = RoundtableError::Backend {
            message: "test".into(),
            source: None,
        };
        let _context = RoundtableError::ContextFile("test".into());
        let _timeout = RoundtableError::Timeout {
            duration: std::time::Duration::from_secs(60),
        };
        let _internal = RoundtableError::Internal("test".into());
    }

    #[test]
    fn error_display_mentions_category() {
        let err = RoundtableError::Config("missing key".into());
        assert!(err.to_string().contains("configuration"));

        let err = RoundtableError::ContextFile("too large".into());
        assert!(err.to_string().contains("context file"));
    }
}
