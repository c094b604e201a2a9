// SPDX-FileCopyrightText: 2026 Roundtable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock backend for deterministic testing.
//!
//! `MockBackend` implements `Backend` with pre-scripted chunk sequences
//! and per-chunk delays, enabling fast, CI-runnable tests of fan-out,
//! timeout isolation, streaming assembly, and cancellation without any
//! real transport.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

use roundtable_core::{
    Backend, BackendInfo, BackendState, Chunk, ChunkStream, ModelStatus, TranscriptMessage,
};

/// One scripted chunk with the delay to wait before emitting it.
#[derive(Debug, Clone)]
pub struct ScriptedChunk {
    pub delay: Duration,
    pub chunk: Chunk,
}

impl ScriptedChunk {
    pub fn immediate(chunk: Chunk) -> Self {
        Self {
            delay: Duration::ZERO,
            chunk,
        }
    }

    pub fn after(delay: Duration, chunk: Chunk) -> Self {
        Self { delay, chunk }
    }
}

/// A recorded `send` invocation.
#[derive(Debug, Clone)]
pub struct SentCall {
    pub history: Vec<TranscriptMessage>,
    pub prompt: String,
}

/// A mock backend replaying scripted chunk sequences.
///
/// Each `send` call pops the next script from a FIFO queue; when the
/// queue is empty a default `"mock reply"` + done script is used.
pub struct MockBackend {
    state: BackendState,
    scripts: Mutex<VecDeque<Vec<ScriptedChunk>>>,
    calls: Arc<Mutex<Vec<SentCall>>>,
    cancel: Mutex<Option<CancellationToken>>,
}

impl MockBackend {
    /// An advisory backend with the given id.
    pub fn new(id: &str) -> Self {
        Self::with_info(BackendInfo {
            id: id.to_string(),
            name: id.to_uppercase(),
            color: "#CCCCCC".to_string(),
            can_exec: false,
            can_read: true,
        })
    }

    /// An executor-capable backend with the given id.
    pub fn executor(id: &str) -> Self {
        Self::with_info(BackendInfo {
            id: id.to_string(),
            name: id.to_uppercase(),
            color: "#CCCCCC".to_string(),
            can_exec: true,
            can_read: true,
        })
    }

    pub fn with_info(info: BackendInfo) -> Self {
        Self {
            state: BackendState::new(info),
            scripts: Mutex::new(VecDeque::new()),
            calls: Arc::new(Mutex::new(Vec::new())),
            cancel: Mutex::new(None),
        }
    }

    /// Scripts a single-text reply followed by a clean terminal.
    pub fn reply(self, text: &str) -> Self {
        self.script(vec![
            ScriptedChunk::immediate(Chunk::text(text)),
            ScriptedChunk::immediate(Chunk::done()),
        ])
    }

    /// Scripts a reply that only arrives after `delay`.
    pub fn reply_after(self, delay: Duration, text: &str) -> Self {
        self.script(vec![
            ScriptedChunk::after(delay, Chunk::text(text)),
            ScriptedChunk::immediate(Chunk::done()),
        ])
    }

    /// Scripts a failing terminal.
    pub fn fail_with(self, message: &str) -> Self {
        self.script(vec![ScriptedChunk::immediate(Chunk::error(message))])
    }

    /// Appends one scripted `send` response.
    pub fn script(self, chunks: Vec<ScriptedChunk>) -> Self {
        self.scripts
            .lock()
            .expect("scripts lock poisoned")
            .push_back(chunks);
        self
    }

    /// All recorded `send` invocations, in order.
    pub fn calls(&self) -> Vec<SentCall> {
        self.calls.lock().expect("calls lock poisoned").clone()
    }

    /// Number of `send` invocations so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("calls lock poisoned").len()
    }

    fn next_script(&self) -> Vec<ScriptedChunk> {
        self.scripts
            .lock()
            .expect("scripts lock poisoned")
            .pop_front()
            .unwrap_or_else(|| {
                vec![
                    ScriptedChunk::immediate(Chunk::text("mock reply")),
                    ScriptedChunk::immediate(Chunk::done()),
                ]
            })
    }
}

#[async_trait]
impl Backend for MockBackend {
    fn info(&self) -> BackendInfo {
        self.state.info()
    }

    async fn send(&self, history: Vec<TranscriptMessage>, prompt: String) -> ChunkStream {
        self.state.set_status(ModelStatus::Responding);

        self.calls
            .lock()
            .expect("calls lock poisoned")
            .push(SentCall {
                history,
                prompt,
            });

        let token = CancellationToken::new();
        *self.cancel.lock().expect("cancel lock poisoned") = Some(token.clone());

        let script = self.next_script();
        let status = self.state.status_handle();
        let (tx, rx) = mpsc::channel(100);

        tokio::spawn(async move {
            for scripted in script {
                if !scripted.delay.is_zero() {
                    tokio::select! {
                        _ = tokio::time::sleep(scripted.delay) => {}
                        _ = token.cancelled() => {
                            status.settle_idle();
                            let _ = tx.send(Chunk::done()).await;
                            return;
                        }
                    }
                }

                let terminal = scripted.chunk.is_terminal();
                if terminal {
                    let exit = if scripted.chunk.is_timeout {
                        ModelStatus::Timeout
                    } else if scripted.chunk.error.is_some() {
                        ModelStatus::Error
                    } else {
                        ModelStatus::Idle
                    };
                    status.set(exit);
                }

                if tx.send(scripted.chunk).await.is_err() {
                    status.settle_idle();
                    return;
                }
                if terminal {
                    return;
                }
            }
            // Script ended without a terminal; close cleanly.
            status.set(ModelStatus::Idle);
            let _ = tx.send(Chunk::done()).await;
        });

        Box::pin(ReceiverStream::new(rx))
    }

    async fn stop(&self) {
        if let Some(token) = self.cancel.lock().expect("cancel lock poisoned").take() {
            token.cancel();
        }
    }

    fn status(&self) -> ModelStatus {
        self.state.status()
    }

    fn set_status(&self, status: ModelStatus) {
        self.state.set_status(status);
    }
}
