// SPDX-FileCopyrightText: 2026 Roundtable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The backend registry.
//!
//! Enumerates configured backends in a fixed declaration order (claude,
//! gemini, gpt, grok) and resolves them by id. Immutable after
//! construction, so it is safe to share across workers without locking.
//!
//! Construction enforces the executor invariant: at most one enabled
//! backend may advertise `can_exec`. A configuration that violates it
//! refuses to start.

use std::sync::Arc;

use tracing::info;

use roundtable_config::RoundtableConfig;
use roundtable_core::{Backend, RoundtableError};

use crate::claude::ClaudeBackend;
use crate::gemini::GeminiBackend;
use crate::retry::RetryPolicy;
use crate::sse::SseBackend;

/// All configured, enabled backends in stable order.
pub struct Registry {
    backends: Vec<Arc<dyn Backend>>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("backends", &self.backends.len())
            .finish()
    }
}

impl Registry {
    /// Builds the registry from configuration.
    ///
    /// API backends additionally require a non-empty credential; a backend
    /// enabled without one was already rejected by config validation.
    pub fn from_config(config: &RoundtableConfig) -> Result<Self, RoundtableError> {
        let policy = RetryPolicy::from_defaults(&config.defaults);
        let mut backends: Vec<Arc<dyn Backend>> = Vec::new();

        let models = &config.models;
        if models.claude.enabled {
            if let Some(ref cli_path) = models.claude.cli_path {
                backends.push(Arc::new(ClaudeBackend::new(
                    cli_path.clone(),
                    models.claude.default_model.clone(),
                )));
            }
        }
        if models.gemini.enabled {
            if let Some(ref cli_path) = models.gemini.cli_path {
                backends.push(Arc::new(GeminiBackend::new(cli_path.clone())));
            }
        }
        if models.gpt.enabled {
            if let Some(ref api_key) = models.gpt.api_key {
                let model = models.gpt.default_model.clone().unwrap_or_default();
                backends.push(Arc::new(SseBackend::gpt(api_key.clone(), model, policy)));
            }
        }
        if models.grok.enabled {
            if let Some(ref api_key) = models.grok.api_key {
                let model = models.grok.default_model.clone().unwrap_or_default();
                backends.push(Arc::new(SseBackend::grok(api_key.clone(), model, policy)));
            }
        }

        let registry = Self::from_backends(backends)?;
        info!(
            backends = ?registry.enabled(),
            "registry initialized"
        );
        Ok(registry)
    }

    /// Builds a registry from pre-constructed backends, enforcing the
    /// executor invariant.
    pub fn from_backends(backends: Vec<Arc<dyn Backend>>) -> Result<Self, RoundtableError> {
        let executors: Vec<String> = backends
            .iter()
            .filter(|b| b.info().can_exec)
            .map(|b| b.info().id)
            .collect();
        if executors.len() > 1 {
            return Err(RoundtableError::Config(format!(
                "at most one backend may have can_exec; found: {}",
                executors.join(", ")
            )));
        }
        Ok(Self { backends })
    }

    /// Resolves a backend by id.
    pub fn get(&self, id: &str) -> Option<Arc<dyn Backend>> {
        self.backends.iter().find(|b| b.info().id == id).cloned()
    }

    /// All backends in registration order.
    pub fn all(&self) -> Vec<Arc<dyn Backend>> {
        self.backends.clone()
    }

    /// IDs of all enabled backends in registration order.
    pub fn enabled(&self) -> Vec<String> {
        self.backends.iter().map(|b| b.info().id).collect()
    }

    /// Number of enabled backends.
    pub fn count(&self) -> usize {
        self.backends.len()
    }

    /// The unique executor-capable backend, if one is registered.
    pub fn executor(&self) -> Option<Arc<dyn Backend>> {
        self.backends.iter().find(|b| b.info().can_exec).cloned()
    }
}
