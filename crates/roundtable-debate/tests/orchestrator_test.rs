// SPDX-FileCopyrightText: 2026 Roundtable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Orchestrator integration tests: fan-out, timeout isolation, ordering,
//! cancellation, and channel-close guarantees.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use roundtable_backends::Registry;
use roundtable_core::{Backend, Chunk, ModelStatus};
use roundtable_debate::{ModelResponse, Orchestrator, CONSENSUS_PROMPT};
use roundtable_test_utils::{MockBackend, ScriptedChunk};

async fn collect(mut rx: tokio::sync::mpsc::Receiver<ModelResponse>) -> Vec<ModelResponse> {
    let mut responses = Vec::new();
    while let Some(response) = rx.recv().await {
        responses.push(response);
    }
    responses
}

fn orchestrator_with(
    backends: Vec<Arc<dyn Backend>>,
    timeout: Duration,
) -> Orchestrator {
    let registry = Arc::new(Registry::from_backends(backends).unwrap());
    Orchestrator::new(registry, timeout, timeout)
}

#[tokio::test]
async fn parallel_fanout_with_timeout_isolation() {
    // Fast model answers in 10ms; slow model never answers within 5s.
    let fast = Arc::new(MockBackend::new("fast").reply_after(Duration::from_millis(10), "ok"));
    let slow = Arc::new(MockBackend::new("slow").reply_after(Duration::from_secs(5), "late"));

    let orchestrator = orchestrator_with(
        vec![fast.clone() as Arc<dyn Backend>, slow.clone()],
        Duration::from_millis(100),
    );

    let rx = orchestrator.parallel_seed(CancellationToken::new(), vec![], "hello".to_string());
    let responses = collect(rx).await;

    let fast_responses: Vec<_> = responses.iter().filter(|r| r.model_id == "fast").collect();
    let text: String = fast_responses.iter().map(|r| r.content.clone()).collect();
    assert_eq!(text, "ok");
    assert!(fast_responses.last().unwrap().done);
    assert!(fast_responses.last().unwrap().error.is_none());

    let slow_responses: Vec<_> = responses.iter().filter(|r| r.model_id == "slow").collect();
    assert_eq!(slow_responses.len(), 1);
    let terminal = slow_responses[0];
    assert!(terminal.done);
    assert!(terminal.is_timeout);
    assert!(terminal.error.as_deref().unwrap().contains("timed out"));

    // No cross-talk, and statuses reflect each backend's own outcome.
    assert_eq!(fast.status(), ModelStatus::Idle);
    assert_eq!(slow.status(), ModelStatus::Timeout);
}

#[tokio::test]
async fn empty_registry_closes_immediately() {
    let orchestrator = orchestrator_with(vec![], Duration::from_secs(1));
    let rx = orchestrator.parallel_seed(CancellationToken::new(), vec![], "hello".to_string());
    let responses = collect(rx).await;
    assert!(responses.is_empty());
}

#[tokio::test]
async fn send_to_unknown_model_closes_immediately() {
    let backend = Arc::new(MockBackend::new("known"));
    let orchestrator = orchestrator_with(vec![backend], Duration::from_secs(1));

    let rx = orchestrator.send_to(
        CancellationToken::new(),
        "unknown",
        vec![],
        "hello".to_string(),
    );
    let responses = collect(rx).await;
    assert!(responses.is_empty());
}

#[tokio::test]
async fn send_to_targets_only_the_named_backend() {
    let a = Arc::new(MockBackend::new("a").reply("from a"));
    let b = Arc::new(MockBackend::new("b").reply("from b"));
    let orchestrator = orchestrator_with(
        vec![a.clone() as Arc<dyn Backend>, b.clone()],
        Duration::from_secs(1),
    );

    let rx = orchestrator.send_to(CancellationToken::new(), "a", vec![], "hi".to_string());
    let responses = collect(rx).await;

    assert!(responses.iter().all(|r| r.model_id == "a"));
    assert_eq!(a.call_count(), 1);
    assert_eq!(b.call_count(), 0);
}

#[tokio::test]
async fn per_backend_chunk_order_is_preserved() {
    let backend = Arc::new(MockBackend::new("m").script(vec![
        ScriptedChunk::immediate(Chunk::text("one ")),
        ScriptedChunk::immediate(Chunk::text("two ")),
        ScriptedChunk::immediate(Chunk::text("three")),
        ScriptedChunk::immediate(Chunk::done()),
    ]));
    let orchestrator = orchestrator_with(vec![backend], Duration::from_secs(1));

    let rx = orchestrator.parallel_seed(CancellationToken::new(), vec![], "go".to_string());
    let responses = collect(rx).await;

    let text: String = responses.iter().map(|r| r.content.clone()).collect();
    assert_eq!(text, "one two three");
    assert!(responses.last().unwrap().done);
}

#[tokio::test]
async fn every_worker_emits_exactly_one_terminal() {
    let ok = Arc::new(MockBackend::new("ok").reply("fine"));
    let failing = Arc::new(MockBackend::new("failing").fail_with("API error 500"));
    let orchestrator = orchestrator_with(
        vec![ok.clone() as Arc<dyn Backend>, failing.clone()],
        Duration::from_secs(1),
    );

    let rx = orchestrator.parallel_seed(CancellationToken::new(), vec![], "go".to_string());
    let responses = collect(rx).await;

    for id in ["ok", "failing"] {
        let terminals = responses
            .iter()
            .filter(|r| r.model_id == id && r.is_terminal())
            .count();
        assert_eq!(terminals, 1, "backend {id} must emit exactly one terminal");
    }

    let failure = responses
        .iter()
        .find(|r| r.model_id == "failing" && r.is_terminal())
        .unwrap();
    assert_eq!(failure.error.as_deref(), Some("API error 500"));
    assert!(!failure.is_timeout);
    assert_eq!(failing.status(), ModelStatus::Error);
}

#[tokio::test]
async fn cancellation_terminates_every_worker_promptly() {
    let a = Arc::new(MockBackend::new("a").reply_after(Duration::from_secs(30), "never"));
    let b = Arc::new(MockBackend::new("b").reply_after(Duration::from_secs(30), "never"));
    let orchestrator = orchestrator_with(
        vec![a.clone() as Arc<dyn Backend>, b.clone()],
        Duration::from_secs(60),
    );

    let cancel = CancellationToken::new();
    let rx = orchestrator.parallel_seed(cancel.clone(), vec![], "go".to_string());

    tokio::time::sleep(Duration::from_millis(50)).await;
    cancel.cancel();

    // The aggregate channel must close within the grace period.
    let responses = tokio::time::timeout(Duration::from_secs(2), collect(rx))
        .await
        .expect("aggregate stream must close after cancellation");

    for id in ["a", "b"] {
        let terminal = responses
            .iter()
            .find(|r| r.model_id == id && r.is_terminal())
            .unwrap_or_else(|| panic!("backend {id} must emit a terminal"));
        assert!(terminal.done);
        assert!(terminal.error.is_none(), "cancellation is not an error");
    }

    for backend in [&a, &b] {
        assert!(matches!(
            backend.status(),
            ModelStatus::Idle | ModelStatus::Error | ModelStatus::Timeout
        ));
    }
}

#[tokio::test]
async fn consensus_prompt_uses_the_fixed_instruction() {
    let backend = Arc::new(MockBackend::new("m").reply("AGREE: [m] fine"));
    let orchestrator = orchestrator_with(vec![backend.clone()], Duration::from_secs(1));

    let rx = orchestrator.consensus_prompt(CancellationToken::new(), vec![]);
    collect(rx).await;

    let calls = backend.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].prompt, CONSENSUS_PROMPT);
    assert!(calls[0].prompt.contains("AGREE"));
    assert!(calls[0].prompt.contains("OBJECT"));
    assert!(calls[0].prompt.contains("ADD"));
}

#[tokio::test]
async fn stop_all_is_idempotent() {
    let backend = Arc::new(MockBackend::new("m"));
    let orchestrator = orchestrator_with(vec![backend], Duration::from_secs(1));
    orchestrator.stop_all().await;
    orchestrator.stop_all().await;
}

#[tokio::test]
async fn history_reaches_the_backend_unchanged() {
    use roundtable_core::TranscriptMessage;

    let backend = Arc::new(MockBackend::new("m").reply("ok"));
    let orchestrator = orchestrator_with(vec![backend.clone()], Duration::from_secs(1));

    let history = vec![
        TranscriptMessage::user("q1"),
        TranscriptMessage::model("other", "a1"),
    ];
    let rx = orchestrator.parallel_seed(CancellationToken::new(), history.clone(), "q2".into());
    collect(rx).await;

    let calls = backend.calls();
    assert_eq!(calls[0].history.len(), 2);
    assert_eq!(calls[0].history[0].source, "user");
    assert_eq!(calls[0].history[1].source, "other");
    assert_eq!(calls[0].prompt, "q2");
}
