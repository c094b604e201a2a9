// SPDX-FileCopyrightText: 2026 Roundtable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session and service integration tests: streaming assembly, consensus
//! scoring, execution gating, and persistence wiring.

use std::sync::Arc;
use std::time::Duration;

use roundtable_backends::Registry;
use roundtable_config::DefaultsConfig;
use roundtable_core::{Backend, Chunk, MessageKind, ModelStatus};
use roundtable_debate::{DebateService, RoundOutcome, EXECUTION_PROMPT};
use roundtable_events::{EventSink, MemoryBridge};
use roundtable_storage::DebateStore;
use roundtable_test_utils::{MockBackend, ScriptedChunk};

struct Fixture {
    service: DebateService,
    store: Arc<DebateStore>,
    _dir: tempfile::TempDir,
}

async fn fixture(backends: Vec<Arc<dyn Backend>>, auto_debate: bool) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("debates.db");
    let store = Arc::new(DebateStore::open(path.to_str().unwrap()).await.unwrap());

    let registry = Arc::new(Registry::from_backends(backends).unwrap());
    let defaults = DefaultsConfig {
        auto_debate,
        model_timeout: 5,
        ..DefaultsConfig::default()
    };
    let service = DebateService::new(
        registry,
        Some(Arc::clone(&store)),
        EventSink::disabled(),
        MemoryBridge::disabled(),
        defaults,
    );

    Fixture {
        service,
        store,
        _dir: dir,
    }
}

fn debate_id(service: &DebateService) -> String {
    service.session().unwrap().state().id.clone()
}

#[tokio::test]
async fn streaming_assembly_seals_one_message() {
    // SSE-style deltas arrive in three pieces, then the round completes.
    let backend: Arc<dyn Backend> = Arc::new(MockBackend::new("gpt").script(vec![
        ScriptedChunk::immediate(Chunk::text("Hel")),
        ScriptedChunk::immediate(Chunk::text("lo, ")),
        ScriptedChunk::immediate(Chunk::text("world")),
        ScriptedChunk::immediate(Chunk::done()),
    ]));

    let mut fx = fixture(vec![backend], false).await;
    fx.service.new_debate(Some("s3".into())).await;
    fx.service.submit_prompt("greet me", |_| {}).await.unwrap();

    let state = fx.service.session().unwrap().state();
    let model_msgs: Vec<_> = state
        .messages
        .iter()
        .filter(|m| m.source == "gpt" && m.kind == MessageKind::Model)
        .collect();
    assert_eq!(model_msgs.len(), 1, "no intermediate duplicate messages");
    assert_eq!(model_msgs[0].content, "Hello, world");

    // The sealed content is durable.
    let rows = fx.store.get_messages(&debate_id(&fx.service)).await.unwrap();
    let sealed: Vec<_> = rows.iter().filter(|r| r.msg_type == "model").collect();
    assert_eq!(sealed.len(), 1);
    assert_eq!(sealed[0].content, "Hello, world");
    assert_eq!(sealed[0].source, "gpt");
}

#[tokio::test]
async fn majority_with_one_dissenter_blocks_execution() {
    let claude: Arc<dyn Backend> =
        Arc::new(MockBackend::executor("claude").reply("AGREE: [GPT] sounds right"));
    let gpt: Arc<dyn Backend> = Arc::new(MockBackend::new("gpt").reply("AGREE: [Claude] yes"));
    let gemini: Arc<dyn Backend> =
        Arc::new(MockBackend::new("gemini").reply("OBJECT: breaks backward compat"));

    let mut fx = fixture(vec![claude, gpt, gemini], false).await;
    fx.service.new_debate(Some("s2".into())).await;

    let outcome = fx.service.submit_prompt("proposal?", |_| {}).await.unwrap();
    let RoundOutcome::Scored { result, .. } = outcome else {
        panic!("seed round must be scored");
    };
    assert_eq!(result.agree_count, 2);
    assert_eq!(result.object_count, 1);
    assert_eq!(result.add_count, 0);
    assert!(!result.has_consensus);
    assert_eq!(result.objections, vec!["breaks backward compat"]);

    // The round summary names the objection count.
    let state = fx.service.session().unwrap().state();
    let summary = state.messages.last().unwrap();
    assert_eq!(summary.source, "system");
    assert!(summary.content.contains("1 objection(s) raised"));

    // /execute is denied without any network dispatch.
    let err = fx.service.execute(|_| {}).await.unwrap_err();
    assert!(err.contains("consensus not reached"));
}

#[tokio::test]
async fn consensus_resolves_debate_and_allows_execution() {
    let claude = Arc::new(
        MockBackend::executor("claude")
            .reply("AGREE: [gpt] sounds right")
            .reply("Plan: add the module, then run tests."),
    );
    let gpt = Arc::new(MockBackend::new("gpt").reply("AGREE: [claude] yes"));

    let mut fx = fixture(
        vec![claude.clone() as Arc<dyn Backend>, gpt.clone()],
        false,
    )
    .await;
    fx.service.new_debate(Some("s5".into())).await;

    let outcome = fx.service.submit_prompt("proposal?", |_| {}).await.unwrap();
    let RoundOutcome::Scored { result, .. } = outcome else {
        panic!("seed round must be scored");
    };
    assert!(result.has_consensus);

    // Debate is resolved in the store with a non-empty consensus text.
    let debate = fx
        .store
        .get_debate(&debate_id(&fx.service))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(debate.status, "resolved");
    assert!(!debate.consensus.clone().unwrap_or_default().is_empty());

    // /execute dispatches exactly one send_to the executor.
    let outcome = fx.service.execute(|_| {}).await.unwrap();
    assert!(matches!(outcome, RoundOutcome::Executed { success: true }));

    assert_eq!(claude.call_count(), 2, "seed round + execution round");
    assert_eq!(gpt.call_count(), 1, "advisors are not contacted for execution");
    assert_eq!(claude.calls()[1].prompt, EXECUTION_PROMPT);
}

#[tokio::test]
async fn timeout_is_recorded_and_does_not_block_others() {
    let fast: Arc<dyn Backend> = Arc::new(MockBackend::new("fast").reply("AGREE: [fast] ok"));
    let slow = Arc::new(MockBackend::new("slow").reply_after(Duration::from_secs(30), "late"));

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("debates.db");
    let store = Arc::new(DebateStore::open(path.to_str().unwrap()).await.unwrap());
    let registry = Arc::new(Registry::from_backends(vec![fast, slow.clone()]).unwrap());
    let defaults = DefaultsConfig {
        auto_debate: false,
        model_timeout: 1,
        ..DefaultsConfig::default()
    };
    let mut service = DebateService::new(
        registry,
        Some(Arc::clone(&store)),
        EventSink::disabled(),
        MemoryBridge::disabled(),
        defaults,
    );

    service.new_debate(Some("timeouts".into())).await;
    service.submit_prompt("q", |_| {}).await.unwrap();

    let state = service.session().unwrap().state();
    assert_eq!(state.status_of("slow"), ModelStatus::Timeout);
    let error_msg = state
        .messages
        .iter()
        .find(|m| m.source == "slow" && m.is_error)
        .expect("timeout must be recorded as an error message");
    assert!(error_msg.is_timeout);

    // Persisted as a system message tagged [ERROR].
    let id = state.id.clone();
    let rows = store.get_messages(&id).await.unwrap();
    assert!(rows
        .iter()
        .any(|r| r.msg_type == "system" && r.content.starts_with("[ERROR]")));

    // Model state snapshot reflects the timeout.
    let states = store.get_model_states(&id).await.unwrap();
    let slow_state = states.iter().find(|s| s.model_id == "slow").unwrap();
    assert_eq!(slow_state.status, "timeout");
}

#[tokio::test]
async fn auto_debate_fires_exactly_one_consensus_round() {
    // Seed replies carry no explicit positions, so the seed round cannot
    // reach consensus and the automatic round fires.
    let a = Arc::new(
        MockBackend::new("a")
            .reply("interesting question")
            .reply("AGREE: [b] after discussion"),
    );
    let b = Arc::new(
        MockBackend::new("b")
            .reply("needs thought")
            .reply("AGREE: [a] after discussion"),
    );

    let mut fx = fixture(vec![a.clone() as Arc<dyn Backend>, b.clone()], true).await;
    fx.service.new_debate(None).await;

    let outcome = fx.service.submit_prompt("q", |_| {}).await.unwrap();

    assert_eq!(a.call_count(), 2, "seed + one automatic consensus round");
    assert_eq!(b.call_count(), 2);

    // The consensus round is the one that gets scored last.
    let RoundOutcome::Scored { result, auto_consensus } = outcome else {
        panic!("expected scored outcome");
    };
    assert!(result.has_consensus);
    assert!(!auto_consensus, "consensus rounds never re-trigger themselves");
}

#[tokio::test]
async fn paused_debate_rejects_prompts() {
    let backend: Arc<dyn Backend> = Arc::new(MockBackend::new("m"));
    let mut fx = fixture(vec![backend], false).await;
    fx.service.new_debate(None).await;

    fx.service
        .handle(roundtable_debate::Command::Pause, |_| {})
        .await;
    let err = fx.service.submit_prompt("q", |_| {}).await.unwrap_err();
    assert!(err.contains("paused"));

    fx.service
        .handle(roundtable_debate::Command::Resume, |_| {})
        .await;
    assert!(fx.service.submit_prompt("q", |_| {}).await.is_ok());
}

#[tokio::test]
async fn context_files_are_tracked_and_persisted() {
    let backend: Arc<dyn Backend> = Arc::new(MockBackend::new("m"));
    let mut fx = fixture(vec![backend], false).await;
    fx.service.new_debate(None).await;

    let ctx_dir = tempfile::tempdir().unwrap();
    let file = ctx_dir.path().join("notes.txt");
    std::fs::write(&file, "remember this").unwrap();
    let path = file.to_str().unwrap();

    let msg = fx.service.add_context(path).await.unwrap();
    assert!(msg.contains("Added"));

    let listing = fx.service.list_context().unwrap();
    assert!(listing.contains(path));

    let stored = fx
        .store
        .get_context_files(&debate_id(&fx.service))
        .await
        .unwrap();
    assert_eq!(stored.len(), 1);
    assert!(stored[0].content.contains("remember this"));

    fx.service.remove_context(path).await.unwrap();
    assert_eq!(fx.service.list_context().unwrap(), "No context files added.");
}

#[tokio::test]
async fn sensitive_context_paths_are_rejected() {
    let backend: Arc<dyn Backend> = Arc::new(MockBackend::new("m"));
    let mut fx = fixture(vec![backend], false).await;
    fx.service.new_debate(None).await;

    let err = fx
        .service
        .add_context("/some/where/.ssh/id_rsa")
        .await
        .unwrap_err();
    // Rejected before any read: traversal-free but sensitive.
    assert!(err.contains("sensitive") || err.contains("does not exist"));

    let err = fx.service.add_context("/tmp/../etc/passwd").await.unwrap_err();
    assert!(err.contains("traversal"));
}

#[tokio::test]
async fn resumed_debate_replays_transcript() {
    let backend: Arc<dyn Backend> = Arc::new(MockBackend::new("claude").reply("first answer"));
    let mut fx = fixture(vec![backend], false).await;
    fx.service.new_debate(Some("resumable".into())).await;
    fx.service.submit_prompt("q", |_| {}).await.unwrap();
    let id = debate_id(&fx.service);

    // Close and resume from the store.
    fx.service
        .handle(roundtable_debate::Command::CloseDebate, |_| {})
        .await;
    assert!(fx.service.session().is_none());

    let msg = fx.service.resume_debate(&id).await.unwrap();
    assert!(msg.contains("resumable"));

    let state = fx.service.session().unwrap().state();
    assert!(state.messages.iter().any(|m| m.source == "user" && m.content == "q"));
    assert!(state
        .messages
        .iter()
        .any(|m| m.source == "claude" && m.content == "first answer"));
}

#[tokio::test]
async fn executor_plan_with_destructive_ops_gets_a_warning() {
    let claude = Arc::new(
        MockBackend::executor("claude")
            .reply("AGREE: [gpt] do it")
            .reply("Plan: rm -rf ./build then rebuild from scratch."),
    );
    let gpt: Arc<dyn Backend> = Arc::new(MockBackend::new("gpt").reply("AGREE: [claude] yes"));

    let mut fx = fixture(vec![claude as Arc<dyn Backend>, gpt], false).await;
    fx.service.new_debate(None).await;
    fx.service.submit_prompt("clean rebuild?", |_| {}).await.unwrap();
    fx.service.execute(|_| {}).await.unwrap();

    let state = fx.service.session().unwrap().state();
    let warning = state
        .messages
        .iter()
        .find(|m| m.source == "system" && m.content.contains("WARNING"))
        .expect("destructive plan must produce a warning");
    assert!(warning.content.contains("recursive force delete"));
}
