// SPDX-FileCopyrightText: 2026 Roundtable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OpenAI-compatible streaming chat-completions backend.
//!
//! Posts a JSON request with `stream = true` and parses the response body
//! as Server-Sent Events via `eventsource-stream`. Each `data:` payload is
//! decoded; `[DONE]` sentinels and malformed frames are skipped; a chunk
//! is emitted per `choices[0].delta.content` and the stream terminates at
//! `finish_reason == "stop"`.
//!
//! GPT and Grok share this implementation: they differ only in endpoint,
//! identity, and system preamble.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use roundtable_core::{
    Backend, BackendInfo, BackendState, Chunk, ChunkStream, ModelStatus, StatusHandle,
    TranscriptMessage,
};

use crate::prompt::{render_chat_messages, ChatMessage};
use crate::retry::{is_retryable_status, is_retryable_transport, RetryPolicy};

const OPENAI_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
const XAI_ENDPOINT: &str = "https://api.x.ai/v1/chat/completions";

const GPT_SYSTEM_PROMPT: &str = "You are participating in a multi-model debate. Other AI \
     models may respond before or after you. Be direct and substantive. If you agree, say \
     AGREE: [model]. If you disagree, explain why. If you have something to add, say ADD: \
     [point].";

const GROK_SYSTEM_PROMPT: &str = "You are participating in a multi-model debate with other \
     AI models. Be direct and opinionated. If you agree, say AGREE: [model]. If you \
     disagree, explain why. If you have something to add, say ADD: [point]. Don't be \
     sycophantic.";

/// Streaming-response ceiling; the orchestrator's per-model deadline is
/// expected to fire long before this does.
const STREAM_TIMEOUT: Duration = Duration::from_secs(300);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// A backend speaking the OpenAI-compatible streaming chat protocol.
pub struct SseBackend {
    state: BackendState,
    endpoint: String,
    api_key: String,
    model: String,
    system_prompt: String,
    client: reqwest::Client,
    policy: RetryPolicy,
    cancel: Mutex<Option<CancellationToken>>,
}

impl SseBackend {
    /// Creates a backend for an arbitrary OpenAI-compatible endpoint.
    pub fn new(
        info: BackendInfo,
        endpoint: impl Into<String>,
        system_prompt: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        policy: RetryPolicy,
    ) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(STREAM_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            state: BackendState::new(info),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: model.into(),
            system_prompt: system_prompt.into(),
            client,
            policy,
            cancel: Mutex::new(None),
        }
    }

    /// The GPT backend against the OpenAI endpoint.
    pub fn gpt(api_key: impl Into<String>, model: impl Into<String>, policy: RetryPolicy) -> Self {
        Self::new(
            BackendInfo {
                id: "gpt".to_string(),
                name: "GPT".to_string(),
                color: "#00FF00".to_string(),
                can_exec: false,
                can_read: true,
            },
            OPENAI_ENDPOINT,
            GPT_SYSTEM_PROMPT,
            api_key,
            model,
            policy,
        )
    }

    /// The Grok backend against the x.ai endpoint.
    pub fn grok(api_key: impl Into<String>, model: impl Into<String>, policy: RetryPolicy) -> Self {
        Self::new(
            BackendInfo {
                id: "grok".to_string(),
                name: "Grok".to_string(),
                color: "#FFA500".to_string(),
                can_exec: false,
                can_read: true,
            },
            XAI_ENDPOINT,
            GROK_SYSTEM_PROMPT,
            api_key,
            model,
            policy,
        )
    }

    /// Overrides the endpoint (for testing with wiremock).
    #[cfg(test)]
    pub fn with_endpoint(mut self, endpoint: String) -> Self {
        self.endpoint = endpoint;
        self
    }
}

#[derive(Debug, Serialize)]
struct ApiRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
}

#[derive(Debug, Default, Deserialize)]
struct SseData {
    #[serde(default)]
    choices: Vec<SseChoice>,
}

#[derive(Debug, Default, Deserialize)]
struct SseChoice {
    #[serde(default)]
    delta: SseDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SseDelta {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl Backend for SseBackend {
    fn info(&self) -> BackendInfo {
        self.state.info()
    }

    async fn send(&self, history: Vec<TranscriptMessage>, prompt: String) -> ChunkStream {
        self.state.set_status(ModelStatus::Responding);

        let token = CancellationToken::new();
        *self.cancel.lock().expect("cancel lock poisoned") = Some(token.clone());

        let request = ApiRequest {
            model: self.model.clone(),
            messages: render_chat_messages(&self.system_prompt, &history, &prompt),
            stream: true,
        };

        let (tx, rx) = mpsc::channel(100);
        let worker = StreamWorker {
            id: self.state.info().id,
            client: self.client.clone(),
            endpoint: self.endpoint.clone(),
            api_key: self.api_key.clone(),
            policy: self.policy,
            status: self.state.status_handle(),
            token,
            tx,
        };
        tokio::spawn(worker.run(request));

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

/// One streaming request: retry loop, SSE parse, terminal chunk.
struct StreamWorker {
    id: String,
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    policy: RetryPolicy,
    status: StatusHandle,
    token: CancellationToken,
    tx: mpsc::Sender<Chunk>,
}

impl StreamWorker {
    async fn run(self, request: ApiRequest) {
        let response = match self.connect_with_retry(&request).await {
            Some(response) => response,
            // Terminal chunk already emitted (error, timeout, or cancel).
            None => return,
        };

        self.consume_stream(response).await;
    }

    /// Obtains a successful streaming response, retrying transient
    /// failures with backoff. On failure or cancellation the terminal
    /// chunk is emitted here and `None` is returned.
    async fn connect_with_retry(&self, request: &ApiRequest) -> Option<reqwest::Response> {
        for attempt in 1..=self.policy.max_attempts {
            if attempt > 1 {
                let delay = self.policy.delay_for_attempt(attempt - 1);
                warn!(
                    backend = self.id.as_str(),
                    attempt, ?delay, "retrying after transient error"
                );
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = self.token.cancelled() => {
                        self.finish_cancelled().await;
                        return None;
                    }
                }
            }

            let send = self
                .client
                .post(&self.endpoint)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .json(request)
                .send();

            let result = tokio::select! {
                result = send => result,
                _ = self.token.cancelled() => {
                    self.finish_cancelled().await;
                    return None;
                }
            };

            match result {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Some(response);
                    }
                    if is_retryable_status(status) && attempt < self.policy.max_attempts {
                        continue;
                    }
                    let body = response.text().await.unwrap_or_default();
                    self.finish(
                        ModelStatus::Error,
                        Chunk::error(format!("API error {status}: {body}")),
                    )
                    .await;
                    return None;
                }
                Err(e) if e.is_timeout() => {
                    self.finish(ModelStatus::Timeout, Chunk::timeout("request timed out"))
                        .await;
                    return None;
                }
                Err(e) if is_retryable_transport(&e) && attempt < self.policy.max_attempts => {
                    continue;
                }
                Err(e) => {
                    self.finish(
                        ModelStatus::Error,
                        Chunk::error(format!("connection failed: {e}")),
                    )
                    .await;
                    return None;
                }
            }
        }

        self.finish(
            ModelStatus::Error,
            Chunk::error(format!(
                "request failed after {} attempts",
                self.policy.max_attempts
            )),
        )
        .await;
        None
    }

    /// Parses the SSE body, forwarding text deltas until `finish_reason`
    /// or end of stream.
    async fn consume_stream(&self, response: reqwest::Response) {
        let events = response.bytes_stream().eventsource();
        tokio::pin!(events);
        let mut full_len = 0usize;

        loop {
            let event = tokio::select! {
                event = events.next() => event,
                _ = self.token.cancelled() => {
                    self.finish_cancelled().await;
                    return;
                }
            };

            match event {
                None => {
                    // Stream ended without an explicit finish_reason.
                    debug!(backend = self.id.as_str(), chars = full_len, "stream ended");
                    self.finish(ModelStatus::Idle, Chunk::done()).await;
                    return;
                }
                Some(Err(e)) => {
                    self.finish(
                        ModelStatus::Error,
                        Chunk::error(format!("stream error: {e}")),
                    )
                    .await;
                    return;
                }
                Some(Ok(event)) => {
                    if event.data == "[DONE]" {
                        continue;
                    }
                    let data: SseData = match serde_json::from_str(&event.data) {
                        Ok(data) => data,
                        // Malformed frames are skipped.
                        Err(_) => continue,
                    };

                    for choice in data.choices {
                        if let Some(content) = choice.delta.content {
                            if !content.is_empty() {
                                full_len += content.len();
                                if self.tx.send(Chunk::text(content)).await.is_err() {
                                    // Receiver gone; treat as cancellation.
                                    self.status.settle_idle();
                                    return;
                                }
                            }
                        }
                        if choice.finish_reason.as_deref() == Some("stop") {
                            debug!(
                                backend = self.id.as_str(),
                                chars = full_len,
                                "stream finished"
                            );
                            self.finish(ModelStatus::Idle, Chunk::done()).await;
                            return;
                        }
                    }
                }
            }
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

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sse_body(frames: &[&str]) -> String {
        frames
            .iter()
            .map(|f| format!("data: {f}\n\n"))
            .collect::<String>()
    }

    fn delta_frame(content: &str) -> String {
        serde_json::json!({
            "choices": [{"delta": {"content": content}, "finish_reason": null}]
        })
        .to_string()
    }

    fn stop_frame() -> String {
        serde_json::json!({
            "choices": [{"delta": {}, "finish_reason": "stop"}]
        })
        .to_string()
    }

    fn test_backend(endpoint: &str) -> SseBackend {
        SseBackend::gpt("test-key", "gpt-test", RetryPolicy::default())
            .with_endpoint(endpoint.to_string())
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 2,
            base_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(50),
        }
    }

    async fn collect(mut stream: ChunkStream) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        while let Some(chunk) = stream.next().await {
            chunks.push(chunk);
        }
        chunks
    }

    #[tokio::test]
    async fn streaming_deltas_reassemble_without_duplication() {
        let server = MockServer::start().await;
        let body = sse_body(&[
            &delta_frame("Hel"),
            &delta_frame("lo, "),
            &delta_frame("world"),
            &stop_frame(),
            "[DONE]",
        ]);
        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(body),
            )
            .mount(&server)
            .await;

        let backend = test_backend(&server.uri());
        let chunks = collect(backend.send(vec![], "hi".into()).await).await;

        let text: String = chunks.iter().filter_map(|c| c.text.clone()).collect();
        assert_eq!(text, "Hello, world");

        let terminals: Vec<_> = chunks.iter().filter(|c| c.is_terminal()).collect();
        assert_eq!(terminals.len(), 1, "exactly one terminal chunk");
        assert!(terminals[0].done);
        assert!(terminals[0].text.is_none(), "terminal must not repeat text");
        assert_eq!(backend.status(), ModelStatus::Idle);
    }

    #[tokio::test]
    async fn request_carries_auth_and_stream_flag() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .and(header("Authorization", "Bearer test-key"))
            .and(body_partial_json(serde_json::json!({
                "model": "gpt-test",
                "stream": true
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(sse_body(&[&stop_frame()])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let backend = test_backend(&server.uri());
        let chunks = collect(backend.send(vec![], "hi".into()).await).await;
        assert!(chunks.iter().any(|c| c.done));
    }

    #[tokio::test]
    async fn history_is_rendered_with_source_tags() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .and(body_partial_json(serde_json::json!({
                "messages": [
                    {"role": "system", "content": GPT_SYSTEM_PROMPT},
                    {"role": "user", "content": "[user]: first"},
                    {"role": "assistant", "content": "[claude]: reply"},
                    {"role": "user", "content": "next"}
                ]
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(sse_body(&[&stop_frame()])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let backend = test_backend(&server.uri());
        let history = vec![
            TranscriptMessage::user("first"),
            TranscriptMessage::model("claude", "reply"),
        ];
        collect(backend.send(history, "next".into()).await).await;
    }

    #[tokio::test]
    async fn non_retryable_status_fails_fast() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .expect(1)
            .mount(&server)
            .await;

        let backend = test_backend(&server.uri());
        let chunks = collect(backend.send(vec![], "hi".into()).await).await;

        assert_eq!(chunks.len(), 1);
        let err = chunks[0].error.as_deref().unwrap();
        assert!(err.contains("401"), "got: {err}");
        assert!(!chunks[0].is_timeout);
        assert_eq!(backend.status(), ModelStatus::Error);
    }

    #[tokio::test]
    async fn retryable_status_is_retried_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(sse_body(&[&delta_frame("ok"), &stop_frame()])),
            )
            .mount(&server)
            .await;

        let backend = SseBackend::gpt("k", "m", fast_retry()).with_endpoint(server.uri());
        let chunks = collect(backend.send(vec![], "hi".into()).await).await;

        let text: String = chunks.iter().filter_map(|c| c.text.clone()).collect();
        assert_eq!(text, "ok");
        assert!(chunks.last().unwrap().done);
    }

    #[tokio::test]
    async fn exhausted_retries_surface_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .expect(2)
            .mount(&server)
            .await;

        let backend = SseBackend::grok("k", "m", fast_retry()).with_endpoint(server.uri());
        let chunks = collect(backend.send(vec![], "hi".into()).await).await;

        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].error.as_deref().unwrap().contains("429"));
        assert_eq!(backend.status(), ModelStatus::Error);
    }

    #[tokio::test]
    async fn connection_refused_is_an_error_after_retries() {
        let backend = SseBackend::gpt("k", "m", fast_retry())
            .with_endpoint("http://127.0.0.1:59997".to_string());
        let chunks = collect(backend.send(vec![], "hi".into()).await).await;

        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].error.is_some());
        assert!(!chunks[0].is_timeout);
    }

    #[tokio::test]
    async fn stop_cancels_inflight_request_cleanly() {
        let server = MockServer::start().await;
        // A response that never finishes within the test window.
        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(sse_body(&[&delta_frame("partial")]))
                    .set_delay(Duration::from_secs(30)),
            )
            .mount(&server)
            .await;

        let backend = test_backend(&server.uri());
        let mut stream = backend.send(vec![], "hi".into()).await;

        tokio::time::sleep(Duration::from_millis(50)).await;
        backend.stop().await;

        let mut terminal = None;
        while let Some(chunk) = stream.next().await {
            if chunk.is_terminal() {
                terminal = Some(chunk);
            }
        }
        let terminal = terminal.expect("cancellation must still terminate the stream");
        assert!(terminal.done);
        assert!(terminal.error.is_none(), "cancellation is not an error");
        assert_eq!(backend.status(), ModelStatus::Idle);
    }

    #[tokio::test]
    async fn malformed_frames_are_skipped() {
        let server = MockServer::start().await;
        let body = format!(
            "data: not json\n\ndata: {}\n\ndata: {}\n\n",
            delta_frame("fine"),
            stop_frame()
        );
        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(body),
            )
            .mount(&server)
            .await;

        let backend = test_backend(&server.uri());
        let chunks = collect(backend.send(vec![], "hi".into()).await).await;
        let text: String = chunks.iter().filter_map(|c| c.text.clone()).collect();
        assert_eq!(text, "fine");
    }
}
