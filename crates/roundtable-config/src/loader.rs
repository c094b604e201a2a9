// SPDX-FileCopyrightText: 2026 Roundtable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Merge order (later overrides earlier): compiled defaults, the per-user
//! config file (`<config_dir>/roundtable/roundtable.toml`), a local
//! `./roundtable.toml`, and `ROUNDTABLE_*` environment variables.
//!
//! `${NAME}` tokens in config files are expanded from the environment
//! before parsing, so API keys never have to appear in the file itself.

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use tracing::debug;

use crate::diagnostic::ConfigError;
use crate::model::RoundtableConfig;
use crate::validation::validate_config;

/// Returns the per-user config file path.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("roundtable")
        .join("roundtable.toml")
}

/// Load configuration from the standard hierarchy with env var overrides.
pub fn load_config() -> Result<RoundtableConfig, ConfigError> {
    let mut figment = Figment::new().merge(Serialized::defaults(RoundtableConfig::default()));

    for path in [config_path(), PathBuf::from("roundtable.toml")] {
        if let Some(provider) = file_provider(&path)? {
            debug!(path = %path.display(), "merging config file");
            figment = figment.merge(provider);
        }
    }

    let config: RoundtableConfig = figment
        .merge(env_provider())
        .extract()
        .map_err(Box::new)?;

    validate_config(&config)?;
    Ok(config)
}

/// Load configuration from a specific file path (plus env overrides).
pub fn load_config_from_path(path: &Path) -> Result<RoundtableConfig, ConfigError> {
    let mut figment = Figment::new().merge(Serialized::defaults(RoundtableConfig::default()));
    if let Some(provider) = file_provider(path)? {
        figment = figment.merge(provider);
    }
    let config: RoundtableConfig = figment
        .merge(env_provider())
        .extract()
        .map_err(Box::new)?;
    validate_config(&config)?;
    Ok(config)
}

/// Load configuration from raw TOML text only (no files, no env overrides).
///
/// Used for testing and for callers that already hold the file contents.
/// `${NAME}` tokens are still expanded.
pub fn load_config_from_str(toml_content: &str) -> Result<RoundtableConfig, ConfigError> {
    let expanded = expand_env_vars(toml_content);
    let config: RoundtableConfig = Figment::new()
        .merge(Serialized::defaults(RoundtableConfig::default()))
        .merge(Toml::string(&expanded))
        .extract()
        .map_err(Box::new)?;
    validate_config(&config)?;
    Ok(config)
}

/// Reads a config file and returns a Toml provider over its env-expanded
/// contents, or `None` if the file does not exist.
fn file_provider(
    path: &Path,
) -> Result<Option<figment::providers::Data<figment::providers::Toml>>, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(raw) => Ok(Some(Toml::string(&expand_env_vars(&raw)))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ConfigError::Io {
            path: path.display().to_string(),
            source: e,
        }),
    }
}

/// Expands `${NAME}` tokens from the environment.
///
/// Unset variables expand to the empty string, matching shell semantics;
/// validation catches the resulting empty credentials on enabled backends.
pub fn expand_env_vars(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) if after[..end].chars().all(is_env_var_char) => {
                let name = &after[..end];
                out.push_str(&std::env::var(name).unwrap_or_default());
                rest = &after[end + 1..];
            }
            _ => {
                // Not a well-formed token; emit literally.
                out.push_str("${");
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn is_env_var_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `ROUNDTABLE_DEFAULTS_MODEL_TIMEOUT`
/// must map to `defaults.model_timeout`, not `defaults.model.timeout`.
fn env_provider() -> Env {
    Env::prefixed("ROUNDTABLE_").map(|key| {
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("models_claude_", "models.claude.", 1)
            .replacen("models_gemini_", "models.gemini.", 1)
            .replacen("models_gpt_", "models.gpt.", 1)
            .replacen("models_grok_", "models.grok.", 1)
            .replacen("defaults_", "defaults.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("events_", "events.", 1)
            .replacen("memory_", "memory.", 1);
        mapped.into()
    })
}
