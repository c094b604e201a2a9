// SPDX-FileCopyrightText: 2026 Roundtable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fire-and-forget event emission to a local HTTP sink.
//!
//! The core publishes three event kinds: `debate_started`,
//! `consensus_reached`, and `execution_complete`. Delivery is best-effort
//! from a detached task; failures are logged at debug level and otherwise
//! ignored. The core never blocks on the sink.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;
use tracing::debug;

/// Event type names on the wire.
pub const EVENT_DEBATE_STARTED: &str = "debate_started";
pub const EVENT_CONSENSUS_REACHED: &str = "consensus_reached";
pub const EVENT_EXECUTION_COMPLETE: &str = "execution_complete";

/// An event payload.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub event_type: String,
    pub source: String,
    pub timestamp: i64,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub data: BTreeMap<String, String>,
}

/// Fire-and-forget client for the downstream event sink.
///
/// Constructed with `None` when no sink is configured; every emit becomes
/// a no-op.
#[derive(Debug, Clone)]
pub struct EventSink {
    endpoint: Option<String>,
    client: reqwest::Client,
}

impl EventSink {
    /// Creates a sink for the given endpoint, or a disabled sink for `None`.
    pub fn new(endpoint: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()
            .unwrap_or_default();
        Self { endpoint, client }
    }

    /// A sink that never emits.
    pub fn disabled() -> Self {
        Self::new(None)
    }

    /// Whether events will actually be sent.
    pub fn is_enabled(&self) -> bool {
        self.endpoint.is_some()
    }

    /// Emits an event asynchronously. Returns immediately.
    pub fn emit(&self, event_type: &str, data: BTreeMap<String, String>) {
        let Some(endpoint) = self.endpoint.clone() else {
            return;
        };

        let event = Event {
            event_type: event_type.to_string(),
            source: "roundtable".to_string(),
            timestamp: chrono::Utc::now().timestamp(),
            data,
        };

        let client = self.client.clone();
        tokio::spawn(async move {
            match client.post(&endpoint).json(&event).send().await {
                Ok(resp) if resp.status().is_client_error() || resp.status().is_server_error() => {
                    debug!(status = %resp.status(), "event sink rejected event");
                }
                Ok(_) => {}
                // Connection failures are expected when no sink is running.
                Err(e) => debug!(error = %e, "event sink unreachable"),
            }
        });
    }

    /// Emits `debate_started`.
    pub fn debate_started(&self, debate_id: &str, debate_name: &str, model_count: usize) {
        let mut data = BTreeMap::new();
        data.insert("debate_id".to_string(), debate_id.to_string());
        data.insert("debate_name".to_string(), debate_name.to_string());
        data.insert("models".to_string(), model_count.to_string());
        self.emit(EVENT_DEBATE_STARTED, data);
    }

    /// Emits `consensus_reached`.
    pub fn consensus_reached(&self, debate_id: &str, consensus_text: &str) {
        let mut data = BTreeMap::new();
        data.insert("debate_id".to_string(), debate_id.to_string());
        data.insert("consensus".to_string(), truncate(consensus_text, 200));
        self.emit(EVENT_CONSENSUS_REACHED, data);
    }

    /// Emits `execution_complete`.
    pub fn execution_complete(&self, debate_id: &str, success: bool, result: &str) {
        let mut data = BTreeMap::new();
        data.insert("debate_id".to_string(), debate_id.to_string());
        data.insert(
            "status".to_string(),
            if success { "success" } else { "failure" }.to_string(),
        );
        data.insert("result".to_string(), truncate(result, 200));
        self.emit(EVENT_EXECUTION_COMPLETE, data);
    }
}

/// Limits a string to `max_len` characters, ellipsized.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{cut}...")
}
