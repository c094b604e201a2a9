// SPDX-FileCopyrightText: 2026 Roundtable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The session runner: the single consumer of the response stream.
//!
//! `DebateSession` drains orchestrator responses, applies them to the
//! in-memory [`DebateState`], persists sealed and error messages, and on
//! all-done scores the round with the consensus analyzer. All state
//! mutation and all persistence for a debate happen here, which fixes
//! write ordering (seal order) without extra locking.
//!
//! Store failures are a degraded mode: they are logged and the in-memory
//! state remains authoritative for the session.

use std::str::FromStr;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{info, warn};

use roundtable_consensus::{analyze_round, ConsensusResult};
use roundtable_core::{MessageKind, ModelStatus, TranscriptMessage};
use roundtable_events::{DebateRecord, EventSink, MemoryBridge};
use roundtable_storage::{Debate, DebateStore};

use crate::orchestrator::ModelResponse;
use crate::state::{Applied, DebateState};

/// What kind of round is being drained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundKind {
    /// The user's prompt fanned out to every backend.
    Seed,
    /// The explicit AGREE/OBJECT/ADD round.
    Consensus,
    /// The executor-only round dispatched by the gate.
    Execution,
}

/// Result of a completed round.
#[derive(Debug, Clone)]
pub enum RoundOutcome {
    /// A seed or consensus round was scored.
    Scored {
        result: ConsensusResult,
        /// True when the caller should fire one automatic consensus round.
        auto_consensus: bool,
    },
    /// An execution round finished.
    Executed { success: bool },
}

/// One active debate: state mirror, persistence, round scoring.
pub struct DebateSession {
    state: DebateState,
    store: Option<Arc<DebateStore>>,
    events: EventSink,
    memory: MemoryBridge,
    auto_debate: bool,
}

impl DebateSession {
    /// Creates a new debate, registering it in the store.
    pub async fn create(
        id: impl Into<String>,
        name: impl Into<String>,
        project_path: Option<String>,
        store: Option<Arc<DebateStore>>,
        events: EventSink,
        memory: MemoryBridge,
        auto_debate: bool,
    ) -> Self {
        let mut state = DebateState::new(id, name);
        state.project_path = project_path;

        if let Some(ref store) = store {
            if let Err(e) = store
                .create_debate(&state.id, &state.name, state.project_path.as_deref())
                .await
            {
                warn!(error = %e, "failed to persist new debate; continuing in memory");
            }
        }

        Self {
            state,
            store,
            events,
            memory,
            auto_debate,
        }
    }

    /// Rebuilds a session from a stored debate and its messages.
    pub async fn resume(
        debate: Debate,
        store: Arc<DebateStore>,
        events: EventSink,
        memory: MemoryBridge,
        auto_debate: bool,
    ) -> Self {
        let mut state = DebateState::new(debate.id.clone(), debate.name.clone());
        state.project_path = debate.project_path.clone();

        match store.get_messages(&debate.id).await {
            Ok(messages) => {
                for row in messages {
                    let kind =
                        MessageKind::from_str(&row.msg_type).unwrap_or(MessageKind::Model);
                    let mut message = TranscriptMessage::new(row.source, row.content, kind);
                    if let Ok(ts) = chrono::DateTime::parse_from_rfc3339(&row.created_at) {
                        message.created_at = ts.with_timezone(&chrono::Utc);
                    }
                    state.add_message(message);
                }
            }
            Err(e) => warn!(error = %e, "failed to load stored messages"),
        }

        match store.get_context_files(&debate.id).await {
            Ok(files) => {
                for file in files {
                    state.context_files.insert(file.path, file.content);
                }
            }
            Err(e) => warn!(error = %e, "failed to load stored context files"),
        }

        info!(
            debate_id = debate.id.as_str(),
            messages = state.messages.len(),
            "debate resumed"
        );

        Self {
            state,
            store: Some(store),
            events,
            memory,
            auto_debate,
        }
    }

    pub fn state(&self) -> &DebateState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut DebateState {
        &mut self.state
    }

    /// A snapshot of the transcript for fan-out.
    pub fn history(&self) -> Vec<TranscriptMessage> {
        self.state.messages.clone()
    }

    /// Records and persists the user's prompt, starting a new round.
    pub async fn record_user_prompt(&mut self, prompt: &str) {
        self.state.add_user_message(prompt);
        self.persist_message("user", prompt, "user").await;
    }

    /// Records and persists a system message.
    pub async fn record_system_message(&mut self, content: &str) {
        self.state.add_system_message(content);
        self.persist_message("system", content, "system").await;
    }

    /// Applies one response event and persists its effects.
    pub async fn apply(&mut self, response: &ModelResponse) {
        let applied = self.state.apply(response);
        match applied {
            Applied::Error { index } => {
                let content = self.state.messages[index].content.clone();
                let msg_id = self
                    .persist_message(&response.model_id, &format!("[ERROR] {content}"), "system")
                    .await;
                let status = self.state.status_of(&response.model_id);
                self.persist_model_state(&response.model_id, status, msg_id)
                    .await;
            }
            Applied::Sealed { index } => {
                let content = self.state.messages[index].content.clone();
                let msg_id = self
                    .persist_message(&response.model_id, &content, "model")
                    .await;
                self.persist_model_state(&response.model_id, ModelStatus::Idle, msg_id)
                    .await;
            }
            Applied::Completed => {
                self.persist_model_state(&response.model_id, ModelStatus::Idle, None)
                    .await;
            }
            Applied::Streamed | Applied::Ignored => {}
        }
    }

    /// Drains a round to completion, forwarding each event to `on_response`
    /// for display, then scores it.
    pub async fn drain(
        &mut self,
        rx: &mut mpsc::Receiver<ModelResponse>,
        kind: RoundKind,
        mut on_response: impl FnMut(&ModelResponse),
    ) -> RoundOutcome {
        let mut saw_error = false;
        while let Some(response) = rx.recv().await {
            if response.error.is_some() {
                saw_error = true;
            }
            self.apply(&response).await;
            on_response(&response);
        }
        self.on_all_done(kind, saw_error).await
    }

    /// Scores the finished round and appends the summary system message.
    async fn on_all_done(&mut self, kind: RoundKind, saw_error: bool) -> RoundOutcome {
        if kind == RoundKind::Execution {
            let success = !saw_error;
            let result_text = self
                .state
                .messages
                .iter()
                .rev()
                .find(|m| m.kind == MessageKind::Model)
                .map(|m| m.content.clone())
                .unwrap_or_default();
            self.events
                .execution_complete(&self.state.id, success, &result_text);

            let summary = if success {
                "Execution complete."
            } else {
                "Execution failed; see the error above."
            };
            self.record_system_message(summary).await;
            return RoundOutcome::Executed { success };
        }

        let result = analyze_round(&self.state.messages);

        let summary = if result.has_consensus {
            let consensus_text = consensus_text(&result);

            self.events.consensus_reached(&self.state.id, &consensus_text);
            if let Some(ref store) = self.store {
                if let Err(e) = store
                    .update_debate_status(&self.state.id, "resolved", Some(&consensus_text))
                    .await
                {
                    warn!(error = %e, "failed to persist resolved status");
                }
            }
            if self.memory.is_enabled() {
                self.memory.store_debate(&self.memory_record(&consensus_text)).await;
            }
            info!(
                debate_id = self.state.id.as_str(),
                agree = result.agree_count,
                "consensus reached"
            );

            format!(
                "CONSENSUS REACHED: {} models agree (no objections). Ready for execution.",
                result.agree_count
            )
        } else if result.object_count > 0 {
            format!(
                "All models have responded. {} objection(s) raised - consensus not reached.",
                result.object_count
            )
        } else {
            "All models have responded. Any objections or additions?".to_string()
        };

        self.record_system_message(&summary).await;

        let auto_consensus =
            kind == RoundKind::Seed && !result.has_consensus && self.auto_debate;
        RoundOutcome::Scored {
            result,
            auto_consensus,
        }
    }

    /// Builds the record stored in the semantic memory service: the topic
    /// (first user message of the latest round) plus the consensus.
    fn memory_record(&self, consensus: &str) -> DebateRecord {
        let topic = self
            .state
            .messages
            .iter()
            .rev()
            .find(|m| m.source == "user")
            .map(|m| m.content.clone())
            .unwrap_or_default();
        DebateRecord {
            debate_id: self.state.id.clone(),
            name: self.state.name.clone(),
            summary: format!("{topic}\n{consensus}"),
            consensus: Some(consensus.to_string()),
            resolved_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    async fn persist_message(&self, source: &str, content: &str, msg_type: &str) -> Option<i64> {
        let store = self.store.as_ref()?;
        match store
            .add_message(&self.state.id, source, content, msg_type)
            .await
        {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(error = %e, "store write failed; continuing in memory");
                None
            }
        }
    }

    async fn persist_model_state(
        &self,
        model_id: &str,
        status: ModelStatus,
        last_seen_msg: Option<i64>,
    ) {
        let Some(ref store) = self.store else { return };
        if let Err(e) = store
            .upsert_model_state(&self.state.id, model_id, &status.to_string(), last_seen_msg)
            .await
        {
            warn!(error = %e, "model state write failed; continuing in memory");
        }
    }
}

/// The consensus description stored on the debate row.
fn consensus_text(result: &ConsensusResult) -> String {
    let mut text = format!(
        "Agreement target: {}",
        result.agreement_target.as_deref().unwrap_or("(unspecified)")
    );
    if !result.additions.is_empty() {
        text.push_str(&format!(" with {} addition(s)", result.additions.len()));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consensus_text_names_target_and_additions() {
        let result = ConsensusResult {
            agreement_target: Some("gpt".to_string()),
            additions: vec!["benchmark it".to_string()],
            ..ConsensusResult::default()
        };
        assert_eq!(consensus_text(&result), "Agreement target: gpt with 1 addition(s)");

        let bare = ConsensusResult::default();
        assert_eq!(consensus_text(&bare), "Agreement target: (unspecified)");
    }
}
