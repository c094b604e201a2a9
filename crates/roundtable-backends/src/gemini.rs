// SPDX-FileCopyrightText: 2026 Roundtable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gemini CLI backend: subprocess with line-buffered JSON output.
//!
//! Invokes `gemini --output-format stream-json <prompt>`. Shares the event
//! vocabulary of the Claude adapter but is permissive: lines that fail to
//! decode as JSON are treated as plain-text content rather than dropped,
//! because the CLI interleaves unframed text with its event stream.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

use roundtable_core::{
    Backend, BackendInfo, BackendState, Chunk, ChunkStream, ModelStatus, StatusHandle,
    TranscriptMessage,
};

use crate::prompt::render_subprocess_prompt;

const GEMINI_PREAMBLE: &str = "You are participating in a multi-model debate. Other AI \
     models respond alongside you. Be direct and substantive. If you agree with another \
     model, say AGREE: [reason]. If you disagree, say OBJECT: [reason]. If you have \
     something to add, say ADD: [point].";

const LINE_BUFFER_CAPACITY: usize = 10 * 1024 * 1024;

/// The Gemini CLI backend.
pub struct GeminiBackend {
    state: BackendState,
    cli_path: String,
    work_dir: Option<PathBuf>,
    cancel: Mutex<Option<CancellationToken>>,
}

impl GeminiBackend {
    pub fn new(cli_path: impl Into<String>) -> Self {
        Self {
            state: BackendState::new(BackendInfo {
                id: "gemini".to_string(),
                name: "Gemini".to_string(),
                color: "#FF00FF".to_string(),
                can_exec: false,
                can_read: true,
            }),
            cli_path: cli_path.into(),
            work_dir: None,
            cancel: Mutex::new(None),
        }
    }

    /// Sets the working directory for spawned CLI processes.
    pub fn with_work_dir(mut self, dir: PathBuf) -> Self {
        self.work_dir = Some(dir);
        self
    }
}

#[async_trait]
impl Backend for GeminiBackend {
    fn info(&self) -> BackendInfo {
        self.state.info()
    }

    async fn send(&self, history: Vec<TranscriptMessage>, prompt: String) -> ChunkStream {
        self.state.set_status(ModelStatus::Responding);

        let token = CancellationToken::new();
        *self.cancel.lock().expect("cancel lock poisoned") = Some(token.clone());

        let full_prompt = render_subprocess_prompt(GEMINI_PREAMBLE, &history, &prompt);

        let (tx, rx) = mpsc::channel(100);
        let worker = GeminiWorker {
            cli_path: self.cli_path.clone(),
            work_dir: self.work_dir.clone(),
            status: self.state.status_handle(),
            token,
            tx,
        };
        tokio::spawn(worker.run(full_prompt));

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

struct GeminiWorker {
    cli_path: String,
    work_dir: Option<PathBuf>,
    status: StatusHandle,
    token: CancellationToken,
    tx: mpsc::Sender<Chunk>,
}

impl GeminiWorker {
    async fn run(self, full_prompt: String) {
        let mut cmd = Command::new(&self.cli_path);
        cmd.arg("--output-format").arg("stream-json").arg(&full_prompt);
        if let Some(ref dir) = self.work_dir {
            cmd.current_dir(dir);
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                self.finish(
                    ModelStatus::Error,
                    Chunk::error(format!("failed to start {}: {e}", self.cli_path)),
                )
                .await;
                return;
            }
        };

        let stdout = child.stdout.take().expect("stdout piped");
        let mut lines = BufReader::with_capacity(LINE_BUFFER_CAPACITY, stdout).lines();
        let mut full_text = String::new();

        loop {
            let line = tokio::select! {
                line = lines.next_line() => line,
                _ = self.token.cancelled() => {
                    let _ = child.start_kill();
                    let _ = child.wait().await;
                    self.finish_cancelled().await;
                    return;
                }
            };

            match line {
                Ok(Some(line)) => {
                    let Some(chunk) = parse_line(&line, &mut full_text) else {
                        continue;
                    };
                    if chunk.is_terminal() {
                        let _ = child.wait().await;
                        let status = if chunk.error.is_some() {
                            ModelStatus::Error
                        } else {
                            ModelStatus::Idle
                        };
                        self.finish(status, chunk).await;
                        return;
                    }
                    if self.tx.send(chunk).await.is_err() {
                        let _ = child.start_kill();
                        let _ = child.wait().await;
                        self.status.settle_idle();
                        return;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    let _ = child.start_kill();
                    let _ = child.wait().await;
                    self.finish(
                        ModelStatus::Error,
                        Chunk::error(format!("stdout read failed: {e}")),
                    )
                    .await;
                    return;
                }
            }
        }

        let _ = child.wait().await;
        self.finish(ModelStatus::Idle, Chunk::done()).await;
    }

    async fn finish(&self, status: ModelStatus, chunk: Chunk) {
        self.status.set(status);
        let _ = self.tx.send(chunk).await;
    }

    /// Cancellation is not an error: a clean terminal, settling the
    /// status only if no terminal status was recorded already.
    async fn finish_cancelled(&self) {
        self.status.settle_idle();
        let _ = self.tx.send(Chunk::done()).await;
    }
}

/// Permissive line dispatch: non-JSON lines become plain-text content.
fn parse_line(line: &str, full_text: &mut String) -> Option<Chunk> {
    let event: serde_json::Value = match serde_json::from_str(line) {
        Ok(event) => event,
        Err(_) => {
            if line.is_empty() {
                return None;
            }
            full_text.push_str(line);
            return Some(Chunk::text(line));
        }
    };

    match event.get("type").and_then(|t| t.as_str()) {
        Some("assistant") | Some("message") => {
            let blocks = event
                .get("message")
                .and_then(|m| m.get("content"))
                .and_then(|c| c.as_array())?;
            for block in blocks {
                if block.get("type").and_then(|t| t.as_str()) == Some("text") {
                    if let Some(text) = block.get("text").and_then(|t| t.as_str()) {
                        full_text.push_str(text);
                        return Some(Chunk::text(text));
                    }
                }
            }
            None
        }
        Some("content_block_delta") => {
            let text = event
                .get("delta")
                .and_then(|d| d.get("text"))
                .and_then(|t| t.as_str())?;
            full_text.push_str(text);
            Some(Chunk::text(text))
        }
        Some("result") | Some("done") => Some(Chunk::done()),
        Some("error") => {
            let message = event
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown error");
            Some(Chunk::error(message))
        }
        _ => None,
    }
}
