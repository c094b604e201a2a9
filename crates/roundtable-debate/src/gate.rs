// SPDX-FileCopyrightText: 2026 Roundtable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The execution gate.
//!
//! `/execute` reaches the network only when every precondition holds, in
//! order: an active debate exists, the latest round has consensus, and
//! exactly one enabled backend is executor-capable. Any failure yields a
//! denial naming the precondition; no backend is contacted.

use roundtable_backends::Registry;
use roundtable_consensus::analyze_round;

use crate::state::DebateState;

/// The fixed instruction dispatched to the executor.
pub const EXECUTION_PROMPT: &str = "Based on the consensus reached in this debate, please \
implement the agreed-upon approach.

You have execution capabilities. The other models provided advisory input, but you are \
the executor.

Summarize what you're about to do, then proceed with implementation. If you need user \
confirmation for destructive operations, ask first.";

/// A granted execution dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRequest {
    /// The unique executor backend id.
    pub executor_id: String,
    /// The instruction to send it.
    pub prompt: &'static str,
}

/// Why execution was denied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDenial {
    NoActiveDebate,
    ConsensusNotReached { objections: usize },
    NoExecutor,
}

impl std::fmt::Display for GateDenial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoActiveDebate => write!(f, "Cannot execute: no active debate."),
            Self::ConsensusNotReached { objections } => {
                if *objections > 0 {
                    write!(
                        f,
                        "Cannot execute: consensus not reached ({objections} objection(s)). \
                         Use /consensus to check positions."
                    )
                } else {
                    write!(
                        f,
                        "Cannot execute: consensus not reached. Use /consensus to check positions."
                    )
                }
            }
            Self::NoExecutor => {
                write!(f, "Cannot execute: no executor-capable backend is enabled.")
            }
        }
    }
}

/// Checks the preconditions and returns the dispatch or the first denial.
pub fn check(registry: &Registry, state: Option<&DebateState>) -> Result<ExecutionRequest, GateDenial> {
    let state = state.ok_or(GateDenial::NoActiveDebate)?;

    let result = analyze_round(&state.messages);
    if !result.has_consensus {
        return Err(GateDenial::ConsensusNotReached {
            objections: result.object_count,
        });
    }

    let executor = registry.executor().ok_or(GateDenial::NoExecutor)?;
    Ok(ExecutionRequest {
        executor_id: executor.info().id,
        prompt: EXECUTION_PROMPT,
    })
}
