// SPDX-FileCopyrightText: 2026 Roundtable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The debate core: orchestration, state, session, gating, commands.
//!
//! Data flow: a user prompt enters the [`session::DebateSession`], the
//! [`orchestrator::Orchestrator`] fans it out to every registry backend,
//! each adapter produces a chunk stream, the orchestrator merges chunks
//! into per-backend [`orchestrator::ModelResponse`] events, the session
//! (the single consumer) assembles streaming messages and persists them,
//! and on all-done the consensus analyzer scores the round. The
//! [`gate`] decides whether `/execute` may dispatch to the sole executor.

pub mod commands;
pub mod gate;
pub mod guardian;
pub mod orchestrator;
pub mod service;
pub mod session;
pub mod state;

pub use commands::{Command, HELP_TEXT};
pub use gate::{ExecutionRequest, GateDenial, EXECUTION_PROMPT};
pub use orchestrator::{ModelResponse, Orchestrator, CONSENSUS_PROMPT, TIMEOUT_ERROR};
pub use service::DebateService;
pub use session::{DebateSession, RoundKind, RoundOutcome};
pub use state::{Applied, DebateState};
