// SPDX-FileCopyrightText: 2026 Roundtable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration error diagnostics.

use thiserror::Error;

/// Errors produced while loading or validating configuration.
///
/// Config errors are fatal at startup: the binary reports them and exits
/// non-zero.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file exists but could not be read.
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// Figment extraction failed (TOML syntax, unknown keys, type mismatch).
    #[error("invalid configuration: {0}")]
    Extract(#[from] Box<figment::Error>),

    /// A semantic constraint was violated.
    #[error("invalid configuration: {message}")]
    Validation { message: String },
}
