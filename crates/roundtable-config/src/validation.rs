// SPDX-FileCopyrightText: 2026 Roundtable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes: enabled backends must have a usable transport, timeouts must
//! be non-zero, the database path must not be empty.

use crate::diagnostic::ConfigError;
use crate::model::{ModelConfig, RoundtableConfig};

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns the first violation found; config errors are fatal at startup,
/// so one actionable message is enough.
pub fn validate_config(config: &RoundtableConfig) -> Result<(), ConfigError> {
    validate_subprocess_model("models.claude", &config.models.claude)?;
    validate_subprocess_model("models.gemini", &config.models.gemini)?;
    validate_api_model("models.gpt", &config.models.gpt)?;
    validate_api_model("models.grok", &config.models.grok)?;

    if config.defaults.model_timeout == 0 {
        return Err(validation("defaults.model_timeout must be non-zero"));
    }
    if config.defaults.consensus_timeout == 0 {
        return Err(validation("defaults.consensus_timeout must be non-zero"));
    }
    if config.defaults.retry_attempts == 0 {
        return Err(validation("defaults.retry_attempts must be at least 1"));
    }

    if config.storage.database_path.trim().is_empty() {
        return Err(validation("storage.database_path must not be empty"));
    }

    if let Some(ref endpoint) = config.events.endpoint {
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(validation(format!(
                "events.endpoint `{endpoint}` must be an http(s) URL"
            )));
        }
    }

    Ok(())
}

fn validate_subprocess_model(section: &str, model: &ModelConfig) -> Result<(), ConfigError> {
    if model.enabled
        && model
            .cli_path
            .as_deref()
            .map(str::trim)
            .unwrap_or("")
            .is_empty()
    {
        return Err(validation(format!(
            "{section}.cli_path must be set when the backend is enabled"
        )));
    }
    Ok(())
}

fn validate_api_model(section: &str, model: &ModelConfig) -> Result<(), ConfigError> {
    if model.enabled
        && model
            .api_key
            .as_deref()
            .map(str::trim)
            .unwrap_or("")
            .is_empty()
    {
        return Err(validation(format!(
            "{section}.api_key must be set when the backend is enabled \
             (use ${{NAME}} to interpolate from the environment)"
        )));
    }
    Ok(())
}

fn validation(message: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let config = RoundtableConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn enabled_subprocess_without_cli_path_fails() {
        let mut config = RoundtableConfig::default();
        config.models.claude.cli_path = None;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("models.claude.cli_path"));
    }

    #[test]
    fn enabled_api_backend_without_key_fails() {
        let mut config = RoundtableConfig::default();
        config.models.gpt.enabled = true;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("models.gpt.api_key"));
    }

    #[test]
    fn api_backend_with_key_passes() {
        let mut config = RoundtableConfig::default();
        config.models.gpt.enabled = true;
        config.models.gpt.api_key = Some("sk-test".to_string());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn zero_model_timeout_fails() {
        let mut config = RoundtableConfig::default();
        config.defaults.model_timeout = 0;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("model_timeout"));
    }

    #[test]
    fn empty_database_path_fails() {
        let mut config = RoundtableConfig::default();
        config.storage.database_path = "  ".to_string();
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("database_path"));
    }

    #[test]
    fn non_http_event_endpoint_fails() {
        let mut config = RoundtableConfig::default();
        config.events.endpoint = Some("tcp://nope".to_string());
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("events.endpoint"));
    }
}
