// SPDX-FileCopyrightText: 2026 Roundtable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The command surface consumed from the UI.
//!
//! The slash-command parser itself is external; this module defines the
//! tagged variant set it produces and the help text. The semantics live
//! in [`crate::service::DebateService`].

/// A parsed command from the UI layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    NewDebate { name: Option<String> },
    CloseDebate,
    RenameDebate { name: String },
    AddContext { path: String },
    RemoveContext { path: String },
    ListContext,
    ToggleModels,
    ForceConsensus,
    Execute,
    Pause,
    Resume,
    ShowHistory,
    Export,
    /// The external parser reports malformed input through this variant.
    ParseError { message: String },
}

/// Help text for all available commands.
pub const HELP_TEXT: &str = "Available commands:
  /help                  - Show this help
  /new [name]            - Start a new debate
  /close                 - Close the current debate
  /rename <name>         - Rename the current debate
  /context add <path>    - Add a file/directory as context
  /context remove <path> - Remove a context file/directory
  /context list          - List all context files
  /models                - Show model status
  /consensus             - Force a consensus check
  /execute               - Execute the agreed-upon action
  /pause                 - Pause the current debate
  /resume                - Resume a paused debate
  /history               - Show debate history
  /export                - Export the current debate transcript";
