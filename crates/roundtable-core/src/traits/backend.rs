// SPDX-FileCopyrightText: 2026 Roundtable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The backend trait all model integrations implement.
//!
//! A backend is a closed capability set over one model transport: it
//! identifies itself, streams replies, can be stopped, and tracks its own
//! status. Concrete variants (subprocess line-JSON, SSE HTTP) share only
//! this contract, not implementation.

use std::pin::Pin;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures_core::Stream;

use crate::types::{BackendInfo, Chunk, ModelStatus, TranscriptMessage};

/// A finite, push-style stream of response chunks.
///
/// Not restartable. Readers must consume promptly; backpressure is not
/// guaranteed across backends.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Chunk> + Send>>;

/// One integrated AI assistant, exposed through its native transport.
///
/// Contract for [`send`](Backend::send):
/// - exactly one terminal chunk per call (`done = true` or `error != None`);
/// - `text` chunks concatenate in order to the full reply;
/// - the implementation calls `set_status(Responding)` on entry and
///   `set_status(Idle | Error | Timeout)` exactly once on exit;
/// - failures are emitted as chunks, never panics.
#[async_trait]
pub trait Backend: Send + Sync + 'static {
    /// Display information and capability flags.
    fn info(&self) -> BackendInfo;

    /// Sends a prompt with conversation history and returns the chunk stream.
    ///
    /// History is rendered into the transport-appropriate form by the
    /// implementation; source attribution must be preserved so each backend
    /// can see what the others said.
    async fn send(&self, history: Vec<TranscriptMessage>, prompt: String) -> ChunkStream;

    /// Interrupts any in-progress generation, killing child processes or
    /// aborting in-flight requests. Idempotent.
    async fn stop(&self);

    /// Returns the backend's current status.
    fn status(&self) -> ModelStatus;

    /// Updates the backend's status.
    fn set_status(&self, status: ModelStatus);
}

/// Shared identity and status bookkeeping embedded by concrete backends.
///
/// The status cell is shared: [`BackendState::status_handle`] hands out a
/// clone that stream worker tasks use to record their exit status.
#[derive(Debug)]
pub struct BackendState {
    info: BackendInfo,
    status: Arc<Mutex<ModelStatus>>,
}

impl BackendState {
    pub fn new(info: BackendInfo) -> Self {
        Self {
            info,
            status: Arc::new(Mutex::new(ModelStatus::Idle)),
        }
    }

    pub fn info(&self) -> BackendInfo {
        self.info.clone()
    }

    pub fn status(&self) -> ModelStatus {
        *self.status.lock().expect("status lock poisoned")
    }

    pub fn set_status(&self, status: ModelStatus) {
        *self.status.lock().expect("status lock poisoned") = status;
    }

    /// A cloneable handle for setting the status from worker tasks.
    pub fn status_handle(&self) -> StatusHandle {
        StatusHandle {
            status: Arc::clone(&self.status),
        }
    }
}

/// Cloneable write handle to a backend's status cell.
#[derive(Debug, Clone)]
pub struct StatusHandle {
    status: Arc<Mutex<ModelStatus>>,
}

impl StatusHandle {
    pub fn set(&self, status: ModelStatus) {
        *self.status.lock().expect("status lock poisoned") = status;
    }

    pub fn get(&self) -> ModelStatus {
        *self.status.lock().expect("status lock poisoned")
    }

    /// Settles a cancelled stream back to `Idle`, unless a terminal
    /// status (timeout, error) was already recorded for this round.
    pub fn settle_idle(&self) {
        let mut status = self.status.lock().expect("status lock poisoned");
        if *status == ModelStatus::Responding {
            *status = ModelStatus::Idle;
        }
    }
}
