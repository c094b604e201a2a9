// SPDX-FileCopyrightText: 2026 Roundtable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Claude CLI backend: subprocess with line-buffered JSON output.
//!
//! Invokes `claude --print --output-format json -p <prompt>` and dispatches
//! on the `type` field of each JSON line: `system` carries a session id,
//! `result` carries the final text, `assistant` and `content_block_delta`
//! carry incremental text, `error` aborts. Malformed lines are ignored.
//!
//! The conversation history is NOT delegated to the CLI's own session
//! continuation: the transcript contains what every model said, so it is
//! rendered into the prompt argument instead.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use roundtable_core::{
    Backend, BackendInfo, BackendState, Chunk, ChunkStream, ModelStatus, StatusHandle,
    TranscriptMessage,
};

use crate::prompt::render_subprocess_prompt;

const CLAUDE_PREAMBLE: &str = "You are participating in a multi-model debate called \
     Roundtable. Other AI models (GPT, Gemini, Grok) respond alongside you. Be direct and \
     substantive. If you agree with another model, say AGREE: [reason]. If you disagree, \
     say OBJECT: [reason]. If you have something to add, say ADD: [point].";

/// Line buffer capacity: CLI responses can be a single very long JSON line.
const LINE_BUFFER_CAPACITY: usize = 10 * 1024 * 1024;

/// The Claude CLI backend. The only executor-capable backend.
pub struct ClaudeBackend {
    state: BackendState,
    cli_path: String,
    model_name: Option<String>,
    work_dir: Option<PathBuf>,
    session_id: Arc<Mutex<Option<String>>>,
    cancel: Mutex<Option<CancellationToken>>,
}

impl ClaudeBackend {
    pub fn new(cli_path: impl Into<String>, model_name: Option<String>) -> Self {
        Self {
            state: BackendState::new(BackendInfo {
                id: "claude".to_string(),
                name: "Claude".to_string(),
                color: "#00FFFF".to_string(),
                can_exec: true,
                can_read: true,
            }),
            cli_path: cli_path.into(),
            model_name,
            work_dir: None,
            session_id: Arc::new(Mutex::new(None)),
            cancel: Mutex::new(None),
        }
    }

    /// Sets the working directory for spawned CLI processes.
    pub fn with_work_dir(mut self, dir: PathBuf) -> Self {
        self.work_dir = Some(dir);
        self
    }

    /// The session id reported by the CLI, once one has been observed.
    pub fn session_id(&self) -> Option<String> {
        self.session_id.lock().expect("session lock poisoned").clone()
    }
}

#[async_trait]
impl Backend for ClaudeBackend {
    fn info(&self) -> BackendInfo {
        self.state.info()
    }

    async fn send(&self, history: Vec<TranscriptMessage>, prompt: String) -> ChunkStream {
        self.state.set_status(ModelStatus::Responding);

        let token = CancellationToken::new();
        *self.cancel.lock().expect("cancel lock poisoned") = Some(token.clone());

        let full_prompt = render_subprocess_prompt(CLAUDE_PREAMBLE, &history, &prompt);

        let (tx, rx) = mpsc::channel(100);
        let worker = ClaudeWorker {
            cli_path: self.cli_path.clone(),
            model_name: self.model_name.clone(),
            work_dir: self.work_dir.clone(),
            session_id: Arc::clone(&self.session_id),
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

struct ClaudeWorker {
    cli_path: String,
    model_name: Option<String>,
    work_dir: Option<PathBuf>,
    session_id: Arc<Mutex<Option<String>>>,
    status: StatusHandle,
    token: CancellationToken,
    tx: mpsc::Sender<Chunk>,
}

impl ClaudeWorker {
    async fn run(self, full_prompt: String) {
        let mut cmd = Command::new(&self.cli_path);
        cmd.arg("--print").arg("--output-format").arg("json");
        if let Some(ref model) = self.model_name {
            cmd.arg("--model").arg(model);
        }
        cmd.arg("-p").arg(&full_prompt);
        if let Some(ref dir) = self.work_dir {
            cmd.current_dir(dir);
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
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
        let stderr = child.stderr.take().expect("stderr piped");

        // Drain stderr concurrently; surfaced only if no text arrived.
        let stderr_task = tokio::spawn(async move {
            let mut buf = String::new();
            let mut reader = BufReader::new(stderr);
            let _ = reader.read_to_string(&mut buf).await;
            buf
        });

        let mut lines = BufReader::with_capacity(LINE_BUFFER_CAPACITY, stdout).lines();
        let mut full_text = String::new();
        let mut got_text = false;

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
                    let Some(chunk) = self.parse_line(&line, &mut full_text) else {
                        continue;
                    };
                    if chunk.text.is_some() {
                        got_text = true;
                    }
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
                        // Receiver gone; kill the child and bail out.
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

        // EOF without a protocol terminal.
        let _ = child.wait().await;
        let stderr_text = stderr_task.await.unwrap_or_default();

        if !got_text && !stderr_text.trim().is_empty() {
            warn!(stderr = stderr_text.as_str(), "claude produced no output");
            self.finish(
                ModelStatus::Error,
                Chunk::error(format!("claude stderr: {}", stderr_text.trim())),
            )
            .await;
        } else {
            self.finish(ModelStatus::Idle, Chunk::done()).await;
        }
    }

    /// Dispatches one JSON line into a chunk. Malformed lines are ignored.
    fn parse_line(&self, line: &str, full_text: &mut String) -> Option<Chunk> {
        let event: serde_json::Value = serde_json::from_str(line).ok()?;
        let event_type = event.get("type").and_then(|t| t.as_str())?;

        match event_type {
            "system" => {
                self.capture_session_id(&event);
                None
            }
            "result" => {
                self.capture_session_id(&event);

                if let Some(result) = event.get("result").and_then(|r| r.as_str()) {
                    if !result.is_empty() {
                        if event.get("is_error").and_then(|e| e.as_bool()) == Some(true) {
                            return Some(Chunk::error(result));
                        }
                        // The final text travels on the terminal chunk only
                        // when nothing was streamed incrementally before it.
                        let chunk = if full_text.is_empty() {
                            Chunk::done_with(result)
                        } else {
                            Chunk::done()
                        };
                        full_text.push_str(result);
                        return Some(chunk);
                    }
                }

                if event.get("is_error").and_then(|e| e.as_bool()) == Some(true) {
                    return Some(Chunk::error("Claude returned an error"));
                }
                Some(Chunk::done())
            }
            "assistant" => {
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
            "content_block_delta" => {
                let text = event
                    .get("delta")
                    .and_then(|d| d.get("text"))
                    .and_then(|t| t.as_str())?;
                full_text.push_str(text);
                Some(Chunk::text(text))
            }
            "error" => {
                let message = event
                    .get("error")
                    .and_then(|e| e.get("message"))
                    .and_then(|m| m.as_str())
                    .or_else(|| event.get("message").and_then(|m| m.as_str()))
                    .unwrap_or("unknown error");
                Some(Chunk::error(message))
            }
            _ => None,
        }
    }

    fn capture_session_id(&self, event: &serde_json::Value) {
        if let Some(sid) = event.get("session_id").and_then(|s| s.as_str()) {
            debug!(session_id = sid, "claude session id captured");
            *self.session_id.lock().expect("session lock poisoned") = Some(sid.to_string());
        }
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
