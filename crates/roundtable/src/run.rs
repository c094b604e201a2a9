// SPDX-FileCopyrightText: 2026 Roundtable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Startup wiring for the `debate` and `history` subcommands.
//!
//! Config and store failures here are fatal (non-zero exit); a store that
//! opens but later fails mid-session only degrades persistence.

use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use roundtable_backends::Registry;
use roundtable_config::RoundtableConfig;
use roundtable_core::RoundtableError;
use roundtable_debate::DebateService;
use roundtable_events::{EventSink, MemoryBridge};
use roundtable_storage::DebateStore;

use crate::shell;

/// Runs an interactive debate session.
pub async fn run_debate(
    config_path: Option<&Path>,
    resume: Option<String>,
) -> Result<(), RoundtableError> {
    let config = load(config_path)?;
    init_tracing(&config.defaults.log_level);
    info!("starting roundtable");

    let store = Arc::new(DebateStore::open(&config.storage.database_path).await?);
    let registry = Arc::new(Registry::from_config(&config)?);
    if registry.count() == 0 {
        warn!("no backends enabled; debates will receive no responses");
    }

    let events = EventSink::new(config.events.endpoint.clone());
    let memory = MemoryBridge::new(config.memory.endpoint.clone(), config.memory.enabled);
    let mut service = DebateService::new(
        registry,
        Some(store),
        events,
        memory,
        config.defaults.clone(),
    );

    match resume {
        Some(debate_id) => match service.resume_debate(&debate_id).await {
            Ok(message) => println!("{message}"),
            Err(e) => return Err(RoundtableError::Internal(e)),
        },
        None => {
            let message = service.new_debate(None).await;
            println!("{message}");
        }
    }

    shell::run(&mut service).await?;

    service.stop_current().await;
    info!("roundtable shutdown complete");
    Ok(())
}

/// Prints stored debates, most recently updated first.
pub async fn run_history(config_path: Option<&Path>) -> Result<(), RoundtableError> {
    let config = load(config_path)?;
    let store = DebateStore::open(&config.storage.database_path).await?;

    let debates = store.list_debates().await?;
    if debates.is_empty() {
        println!("No stored debates.");
    } else {
        for debate in debates {
            println!(
                "{} [{}] {} (updated {})",
                debate.id, debate.status, debate.name, debate.updated_at
            );
        }
    }
    store.close().await?;
    Ok(())
}

fn load(config_path: Option<&Path>) -> Result<RoundtableConfig, RoundtableError> {
    let result = match config_path {
        Some(path) => roundtable_config::load_config_from_path(path),
        None => roundtable_config::load_config(),
    };
    result.map_err(|e| RoundtableError::Config(e.to_string()))
}

/// Initializes the tracing subscriber with the configured log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("roundtable={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}
