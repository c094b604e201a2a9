// SPDX-FileCopyrightText: 2026 Roundtable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Boundary HTTP clients for Roundtable.
//!
//! [`EventSink`] publishes fire-and-forget lifecycle events to a local
//! sink; [`MemoryBridge`] stores and retrieves resolved debates from an
//! optional semantic memory service. Both degrade silently when their
//! services are absent: the core never blocks on, or fails because of,
//! a downstream collaborator.

pub mod memory;
pub mod sink;

pub use memory::{DebateRecord, MemoryBridge, RetrievedDebate};
pub use sink::{
    Event, EventSink, EVENT_CONSENSUS_REACHED, EVENT_DEBATE_STARTED, EVENT_EXECUTION_COMPLETE,
};
