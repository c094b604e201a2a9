// SPDX-FileCopyrightText: 2026 Roundtable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Concrete backend adapters for Roundtable.
//!
//! Two transport families implement the [`roundtable_core::Backend`]
//! contract:
//!
//! - **Subprocess line-JSON**: [`ClaudeBackend`] (strict parsing, stderr
//!   surfacing, session-id capture) and [`GeminiBackend`] (permissive:
//!   unframed lines become content).
//! - **SSE HTTP**: [`SseBackend`] speaking OpenAI-compatible streaming
//!   chat completions, instantiated for GPT and Grok.
//!
//! The [`Registry`] assembles enabled backends from configuration in a
//! stable order and enforces the single-executor invariant. Transient
//! transport failures are retried inside the adapters per
//! [`retry::RetryPolicy`]; the orchestrator never re-sends.

pub mod claude;
pub mod gemini;
pub mod prompt;
pub mod registry;
pub mod retry;
pub mod sse;

pub use claude::ClaudeBackend;
pub use gemini::GeminiBackend;
pub use registry::Registry;
pub use retry::RetryPolicy;
pub use sse::SseBackend;
