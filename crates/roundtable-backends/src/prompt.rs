// SPDX-FileCopyrightText: 2026 Roundtable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! History rendering for the two transport families.
//!
//! Subprocess backends receive the whole debate as one prompt argument: a
//! short system preamble, the transcript with source tags, and the current
//! prompt. SSE backends receive proper role-tagged chat messages, with the
//! source interpolated into the content so every backend can see which
//! participant said what.

use serde::Serialize;

use roundtable_core::TranscriptMessage;

/// A role-tagged chat message for OpenAI-compatible APIs.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Builds the single prompt argument for a subprocess backend.
pub fn render_subprocess_prompt(
    preamble: &str,
    history: &[TranscriptMessage],
    prompt: &str,
) -> String {
    let mut out = String::new();
    out.push_str(preamble);
    out.push_str("\n\n");

    if !history.is_empty() {
        out.push_str("=== CONVERSATION SO FAR ===\n");
        for msg in history {
            out.push_str(&format!("[{}]: {}\n\n", msg.source, msg.content));
        }
        out.push_str("=== END CONVERSATION ===\n\n");
    }

    out.push_str("Current prompt:\n");
    out.push_str(prompt);
    out
}

/// Builds the role-tagged message array for an SSE backend.
///
/// History entries from the user keep the `user` role; everything else
/// (other models, system notes) becomes `assistant` content tagged with
/// its source so attribution survives the role mapping.
pub fn render_chat_messages(
    system_prompt: &str,
    history: &[TranscriptMessage],
    prompt: &str,
) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::system(system_prompt));

    for msg in history {
        let content = format!("[{}]: {}", msg.source, msg.content);
        if msg.source == "user" {
            messages.push(ChatMessage::user(content));
        } else {
            messages.push(ChatMessage::assistant(content));
        }
    }

    messages.push(ChatMessage::user(prompt));
    messages
}
