// SPDX-FileCopyrightText: 2026 Roundtable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The orchestrator: parallel fan-out with timeout isolation.
//!
//! One worker task per enabled backend forwards that backend's chunks as
//! [`ModelResponse`] events into a shared bounded channel. The channel
//! closes exactly when every worker has emitted its terminal event (all
//! senders dropped). Per-backend chunk order is preserved; cross-backend
//! interleaving is arbitrary.
//!
//! Each worker owns its backend's deadline: expiry stops the backend and
//! synthesizes a timeout terminal without touching the other workers.
//! Retries happen inside the adapters, never here, so partial streaming
//! output is never duplicated.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use roundtable_backends::Registry;
use roundtable_core::{Backend, ModelStatus, TranscriptMessage};

/// The timeout error text recorded for expired backends.
pub const TIMEOUT_ERROR: &str = "model response timed out";

/// The fixed instruction asking every backend for an explicit position.
pub const CONSENSUS_PROMPT: &str = "Based on the discussion so far, please state your position:
- If you agree with a proposed approach, say \"AGREE: [model name]\" and briefly explain why
- If you object, say \"OBJECT:\" and explain your reasoning
- If you have something to add, say \"ADD:\" and state your point

Be explicit about your position.";

/// One event on the aggregate response stream.
#[derive(Debug, Clone, Default)]
pub struct ModelResponse {
    pub model_id: String,
    /// Incremental content; empty on terminal events.
    pub content: String,
    /// True on the terminal event of this backend's round.
    pub done: bool,
    pub error: Option<String>,
    pub is_timeout: bool,
}

impl ModelResponse {
    pub fn content(model_id: &str, content: impl Into<String>) -> Self {
        Self {
            model_id: model_id.to_string(),
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn done(model_id: &str) -> Self {
        Self {
            model_id: model_id.to_string(),
            done: true,
            ..Self::default()
        }
    }

    pub fn failed(model_id: &str, error: impl Into<String>, is_timeout: bool) -> Self {
        Self {
            model_id: model_id.to_string(),
            done: true,
            error: Some(error.into()),
            is_timeout,
            ..Self::default()
        }
    }

    /// Whether this event terminates its backend's round.
    pub fn is_terminal(&self) -> bool {
        self.done || self.error.is_some()
    }
}

/// Fans prompts out to registry backends and aggregates their streams.
pub struct Orchestrator {
    registry: Arc<Registry>,
    model_timeout: Duration,
    consensus_timeout: Duration,
}

impl Orchestrator {
    pub fn new(
        registry: Arc<Registry>,
        model_timeout: Duration,
        consensus_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            model_timeout,
            consensus_timeout,
        }
    }

    /// Sends the prompt to all enabled backends in parallel.
    ///
    /// The returned channel closes once every backend has produced its
    /// terminal response. An empty registry yields an immediately-closed
    /// channel.
    pub fn parallel_seed(
        &self,
        cancel: CancellationToken,
        history: Vec<TranscriptMessage>,
        prompt: String,
    ) -> mpsc::Receiver<ModelResponse> {
        self.fan_out(cancel, history, prompt, self.model_timeout)
    }

    fn fan_out(
        &self,
        cancel: CancellationToken,
        history: Vec<TranscriptMessage>,
        prompt: String,
        timeout: Duration,
    ) -> mpsc::Receiver<ModelResponse> {
        // Generously bounded: an order of magnitude above the backend
        // count to tolerate bursts.
        let capacity = self.registry.count().max(1) * 10;
        let (tx, rx) = mpsc::channel(capacity);

        for backend in self.registry.all() {
            let worker = Worker {
                backend,
                timeout,
                cancel: cancel.clone(),
                tx: tx.clone(),
            };
            tokio::spawn(worker.run(history.clone(), prompt.clone()));
        }

        // Workers hold the remaining senders; the channel closes when the
        // last worker exits.
        drop(tx);
        rx
    }

    /// Sends the prompt to a single backend.
    ///
    /// An unknown id yields an immediately-closed channel.
    pub fn send_to(
        &self,
        cancel: CancellationToken,
        model_id: &str,
        history: Vec<TranscriptMessage>,
        prompt: String,
    ) -> mpsc::Receiver<ModelResponse> {
        let (tx, rx) = mpsc::channel(10);

        match self.registry.get(model_id) {
            Some(backend) => {
                let worker = Worker {
                    backend,
                    timeout: self.model_timeout,
                    cancel,
                    tx,
                };
                tokio::spawn(worker.run(history, prompt));
            }
            None => {
                warn!(model_id, "send_to target not in registry");
            }
        }
        rx
    }

    /// Asks every backend for an explicit AGREE/OBJECT/ADD statement,
    /// under the (shorter) consensus-round deadline.
    pub fn consensus_prompt(
        &self,
        cancel: CancellationToken,
        history: Vec<TranscriptMessage>,
    ) -> mpsc::Receiver<ModelResponse> {
        self.fan_out(
            cancel,
            history,
            CONSENSUS_PROMPT.to_string(),
            self.consensus_timeout,
        )
    }

    /// Stops every backend. Idempotent.
    pub async fn stop_all(&self) {
        for backend in self.registry.all() {
            backend.stop().await;
        }
    }
}

/// One backend's round: deadline, cancellation, chunk forwarding.
struct Worker {
    backend: Arc<dyn Backend>,
    timeout: Duration,
    cancel: CancellationToken,
    tx: mpsc::Sender<ModelResponse>,
}

impl Worker {
    async fn run(self, history: Vec<TranscriptMessage>, prompt: String) {
        let id = self.backend.info().id;
        let deadline = tokio::time::sleep(self.timeout);
        tokio::pin!(deadline);

        let mut chunks = self.backend.send(history, prompt).await;

        loop {
            tokio::select! {
                _ = &mut deadline => {
                    debug!(backend = id.as_str(), "per-model deadline expired");
                    self.backend.stop().await;
                    self.backend.set_status(ModelStatus::Timeout);
                    let _ = self
                        .tx
                        .send(ModelResponse::failed(&id, TIMEOUT_ERROR, true))
                        .await;
                    return;
                }
                _ = self.cancel.cancelled() => {
                    // Cancellation is not an error: a clean terminal with
                    // no recorded failure.
                    self.backend.stop().await;
                    self.backend.set_status(ModelStatus::Idle);
                    let _ = self.tx.send(ModelResponse::done(&id)).await;
                    return;
                }
                chunk = chunks.next() => {
                    let Some(chunk) = chunk else {
                        // Stream closed without a protocol terminal.
                        self.backend.set_status(ModelStatus::Idle);
                        let _ = self.tx.send(ModelResponse::done(&id)).await;
                        return;
                    };

                    if let Some(error) = chunk.error {
                        let status = if chunk.is_timeout {
                            ModelStatus::Timeout
                        } else {
                            ModelStatus::Error
                        };
                        self.backend.set_status(status);
                        let _ = self
                            .tx
                            .send(ModelResponse::failed(&id, error, chunk.is_timeout))
                            .await;
                        return;
                    }

                    if let Some(text) = chunk.text {
                        if !text.is_empty()
                            && self.tx.send(ModelResponse::content(&id, text)).await.is_err()
                        {
                            // Aggregate receiver gone: the round was abandoned.
                            self.backend.stop().await;
                            return;
                        }
                    }

                    if chunk.done {
                        self.backend.set_status(ModelStatus::Idle);
                        let _ = self.tx.send(ModelResponse::done(&id)).await;
                        return;
                    }
                }
            }
        }
    }
}
