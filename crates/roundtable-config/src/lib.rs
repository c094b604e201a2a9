// SPDX-FileCopyrightText: 2026 Roundtable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loading for the Roundtable debate orchestrator.
//!
//! TOML configuration with layered merging (defaults, per-user file, local
//! file, `ROUNDTABLE_*` environment overrides), `${NAME}` environment
//! interpolation for credentials, and semantic validation. Configuration
//! errors are fatal at startup.

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

pub use diagnostic::ConfigError;
pub use loader::{config_path, load_config, load_config_from_path, load_config_from_str};
pub use model::{
    DefaultsConfig, EventsConfig, MemoryConfig, ModelConfig, ModelsConfig, RoundtableConfig,
    StorageConfig,
};
pub use validation::validate_config;
