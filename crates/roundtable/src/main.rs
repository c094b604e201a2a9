// SPDX-FileCopyrightText: 2026 Roundtable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Roundtable - structured debates among heterogeneous AI assistants.
//!
//! This is the binary entry point. Exit code is 0 on clean shutdown and
//! non-zero only on fatal startup errors (unreadable config, unopenable
//! store).

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

mod run;
mod shell;

/// Roundtable - multi-model debates with consensus-gated execution.
#[derive(Parser, Debug)]
#[command(name = "roundtable", version, about, long_about = None)]
struct Cli {
    /// Path to an explicit config file (defaults to the per-user config).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start an interactive debate session.
    Debate {
        /// Resume a stored debate by id instead of starting fresh.
        #[arg(long)]
        resume: Option<String>,
    },
    /// List stored debates.
    History,
    /// Print the resolved config file path.
    ConfigPath,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Debate { resume } => run::run_debate(cli.config.as_deref(), resume).await,
        Commands::History => run::run_history(cli.config.as_deref()).await,
        Commands::ConfigPath => {
            println!("{}", roundtable_config::config_path().display());
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
