// SPDX-FileCopyrightText: 2026 Roundtable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for Roundtable.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Roundtable configuration.
///
/// Loaded from TOML files with `${NAME}` environment interpolation and
/// `ROUNDTABLE_*` environment variable overrides. All sections are optional
/// and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RoundtableConfig {
    /// Per-backend model settings.
    #[serde(default)]
    pub models: ModelsConfig,

    /// Debate behavior defaults (timeouts, retries, auto-debate).
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Downstream event sink settings.
    #[serde(default)]
    pub events: EventsConfig,

    /// Optional long-term semantic memory bridge settings.
    #[serde(default)]
    pub memory: MemoryConfig,
}

/// The fixed set of configurable backends.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ModelsConfig {
    /// Claude CLI (subprocess, line-JSON). The only executor-capable backend.
    #[serde(default = "default_claude")]
    pub claude: ModelConfig,

    /// Gemini CLI (subprocess, line-JSON, permissive parsing).
    #[serde(default = "default_gemini")]
    pub gemini: ModelConfig,

    /// GPT (OpenAI chat-completions SSE).
    #[serde(default = "default_gpt")]
    pub gpt: ModelConfig,

    /// Grok (x.ai chat-completions SSE).
    #[serde(default = "default_grok")]
    pub grok: ModelConfig,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            claude: default_claude(),
            gemini: default_gemini(),
            gpt: default_gpt(),
            grok: default_grok(),
        }
    }
}

/// Settings for one backend.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ModelConfig {
    /// Include this backend in the registry.
    #[serde(default)]
    pub enabled: bool,

    /// Executable to invoke (subprocess backends).
    #[serde(default)]
    pub cli_path: Option<String>,

    /// Bearer credential (API backends). Supports `${NAME}` interpolation.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Backend-specific model identifier.
    #[serde(default)]
    pub default_model: Option<String>,
}

fn default_claude() -> ModelConfig {
    ModelConfig {
        enabled: true,
        cli_path: Some("claude".to_string()),
        api_key: None,
        default_model: Some("opus".to_string()),
    }
}

fn default_gemini() -> ModelConfig {
    ModelConfig {
        enabled: true,
        cli_path: Some("gemini".to_string()),
        api_key: None,
        default_model: None,
    }
}

fn default_gpt() -> ModelConfig {
    ModelConfig {
        enabled: false,
        cli_path: None,
        api_key: None,
        default_model: Some("gpt-4o".to_string()),
    }
}

fn default_grok() -> ModelConfig {
    ModelConfig {
        enabled: false,
        cli_path: None,
        api_key: None,
        default_model: Some("grok-2-latest".to_string()),
    }
}

/// Debate behavior defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DefaultsConfig {
    /// Fire one consensus round automatically after the seed round.
    #[serde(default = "default_auto_debate")]
    pub auto_debate: bool,

    /// Deadline for a consensus round, in seconds.
    #[serde(default = "default_consensus_timeout")]
    pub consensus_timeout: u64,

    /// Per-backend deadline per call, in seconds.
    #[serde(default = "default_model_timeout")]
    pub model_timeout: u64,

    /// Retry attempts for transient transport errors (inside adapters).
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Base retry delay in milliseconds; doubled each attempt up to 10 s.
    #[serde(default = "default_retry_delay")]
    pub retry_delay: u64,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            auto_debate: default_auto_debate(),
            consensus_timeout: default_consensus_timeout(),
            model_timeout: default_model_timeout(),
            retry_attempts: default_retry_attempts(),
            retry_delay: default_retry_delay(),
            log_level: default_log_level(),
        }
    }
}

fn default_auto_debate() -> bool {
    true
}

fn default_consensus_timeout() -> u64 {
    30
}

fn default_model_timeout() -> u64 {
    60
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    1000
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file. Defaults to
    /// `<data_dir>/roundtable/debates.db`.
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|d| d.join("roundtable").join("debates.db"))
        .and_then(|p| p.to_str().map(str::to_string))
        .unwrap_or_else(|| "debates.db".to_string())
}

/// Downstream event sink settings.
///
/// When `endpoint` is unset, no events are emitted.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EventsConfig {
    /// HTTP endpoint receiving fire-and-forget event POSTs
    /// (e.g. `http://127.0.0.1:5965/event`).
    #[serde(default)]
    pub endpoint: Option<String>,
}

/// Optional semantic memory bridge settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryConfig {
    /// Store resolved debates in the memory service.
    #[serde(default)]
    pub enabled: bool,

    /// Memory service endpoint.
    #[serde(default = "default_memory_endpoint")]
    pub endpoint: String,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_memory_endpoint(),
        }
    }
}

fn default_memory_endpoint() -> String {
    "http://127.0.0.1:8009".to_string()
}
