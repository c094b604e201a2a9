// SPDX-FileCopyrightText: 2026 Roundtable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait definitions for Roundtable backends.

pub mod backend;

pub use backend::{Backend, BackendState, ChunkStream, StatusHandle};
