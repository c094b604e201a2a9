// SPDX-FileCopyrightText: 2026 Roundtable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for the Roundtable workspace.
//!
//! Provides [`MockBackend`], a scripted `Backend` implementation used by
//! orchestrator, session, and gate tests to simulate fast, slow, failing,
//! and streaming backends deterministically.

pub mod mock_backend;

pub use mock_backend::{MockBackend, ScriptedChunk, SentCall};
