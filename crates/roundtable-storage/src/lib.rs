// SPDX-FileCopyrightText: 2026 Roundtable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for Roundtable.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a
//! single-writer concurrency model via `tokio-rusqlite`, and typed CRUD
//! operations for debates, messages, context files, and per-model state.
//!
//! Store failures are a degraded mode, not a stop condition: callers log
//! them and keep the in-memory debate state authoritative for the session.

pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;
pub mod store;
pub mod writer;

pub use database::Database;
pub use models::*;
pub use store::DebateStore;
