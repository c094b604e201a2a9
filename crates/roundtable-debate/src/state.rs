// SPDX-FileCopyrightText: 2026 Roundtable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory mirror of one debate with streaming assembly buffers.
//!
//! For each model, at most one open streaming message may exist at a
//! time; it always belongs to the latest round. Applying a response event
//! either records an error, grows the open streaming message in place, or
//! seals it.

use std::collections::{BTreeMap, HashMap};

use roundtable_core::{MessageKind, ModelStatus, TranscriptMessage};

use crate::orchestrator::ModelResponse;

/// The outcome of applying one response event, telling the session runner
/// what to persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    /// An error message was appended at this index.
    Error { index: usize },
    /// Content was appended to a streaming message; nothing to persist yet.
    Streamed,
    /// The streaming message at this index was sealed; persist its content.
    Sealed { index: usize },
    /// A terminal arrived with no open streaming message.
    Completed,
    /// Nothing to do.
    Ignored,
}

/// One active debate's in-memory state.
#[derive(Debug, Clone)]
pub struct DebateState {
    pub id: String,
    pub name: String,
    pub project_path: Option<String>,
    pub messages: Vec<TranscriptMessage>,
    /// path -> formatted content.
    pub context_files: BTreeMap<String, String>,
    pub model_status: HashMap<String, ModelStatus>,
    pub paused: bool,
    /// model id -> index of its open streaming message.
    streaming: HashMap<String, usize>,
}

impl DebateState {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            project_path: None,
            messages: Vec::new(),
            context_files: BTreeMap::new(),
            model_status: HashMap::new(),
            paused: false,
            streaming: HashMap::new(),
        }
    }

    /// Appends a finalized message, returning its index.
    pub fn add_message(&mut self, message: TranscriptMessage) -> usize {
        self.messages.push(message);
        self.messages.len() - 1
    }

    pub fn add_user_message(&mut self, content: impl Into<String>) -> usize {
        // A new user message starts a new round; no streaming message may
        // survive across rounds.
        self.streaming.clear();
        self.add_message(TranscriptMessage::user(content))
    }

    pub fn add_system_message(&mut self, content: impl Into<String>) -> usize {
        self.add_message(TranscriptMessage::system(content))
    }

    /// Applies one orchestrator response event.
    pub fn apply(&mut self, response: &ModelResponse) -> Applied {
        if let Some(ref error) = response.error {
            let status = if response.is_timeout {
                ModelStatus::Timeout
            } else {
                ModelStatus::Error
            };
            self.model_status.insert(response.model_id.clone(), status);
            // The round is over for this model; abandon any open stream.
            self.streaming.remove(&response.model_id);

            let mut message = TranscriptMessage::new(
                response.model_id.clone(),
                error.clone(),
                MessageKind::System,
            );
            message.is_error = true;
            message.is_timeout = response.is_timeout;
            let index = self.add_message(message);
            return Applied::Error { index };
        }

        let mut streamed = false;
        if !response.content.is_empty() {
            self.model_status
                .insert(response.model_id.clone(), ModelStatus::Responding);

            match self.streaming.get(&response.model_id) {
                Some(&index) => {
                    self.messages[index].content.push_str(&response.content);
                }
                None => {
                    let index = self.add_message(TranscriptMessage::model(
                        response.model_id.clone(),
                        response.content.clone(),
                    ));
                    self.streaming.insert(response.model_id.clone(), index);
                }
            }
            streamed = true;
        }

        if response.done {
            self.model_status
                .insert(response.model_id.clone(), ModelStatus::Idle);
            return match self.streaming.remove(&response.model_id) {
                Some(index) => Applied::Sealed { index },
                None => Applied::Completed,
            };
        }

        if streamed {
            Applied::Streamed
        } else {
            Applied::Ignored
        }
    }

    /// Whether the given model currently has an open streaming message.
    pub fn is_streaming(&self, model_id: &str) -> bool {
        self.streaming.contains_key(model_id)
    }

    pub fn status_of(&self, model_id: &str) -> ModelStatus {
        self.model_status
            .get(model_id)
            .copied()
            .unwrap_or_default()
    }
}
