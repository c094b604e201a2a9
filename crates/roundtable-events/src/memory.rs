// SPDX-FileCopyrightText: 2026 Roundtable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Client for the optional long-term semantic memory service.
//!
//! Resolved debates can be stored for later retrieval so future debates on
//! similar topics can see what was agreed before. The service is optional:
//! when it is absent or failing, every operation degrades silently and the
//! debate proceeds without memory.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// A debate stored in or retrieved from the memory service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateRecord {
    pub debate_id: String,
    pub name: String,
    /// Compact transcript summary for embedding.
    pub summary: String,
    /// Consensus description, if the debate resolved.
    #[serde(default)]
    pub consensus: Option<String>,
    /// ISO 8601 timestamp of resolution.
    pub resolved_at: String,
}

/// A retrieval hit with its relevance score.
#[derive(Debug, Clone, Deserialize)]
pub struct RetrievedDebate {
    pub record: DebateRecord,
    pub score: f64,
}

/// Client for the semantic memory bridge.
#[derive(Debug, Clone)]
pub struct MemoryBridge {
    endpoint: String,
    enabled: bool,
    client: reqwest::Client,
}

impl MemoryBridge {
    pub fn new(endpoint: String, enabled: bool) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_default();
        Self {
            endpoint,
            enabled,
            client,
        }
    }

    /// A bridge that never talks to the network.
    pub fn disabled() -> Self {
        Self::new(String::new(), false)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Probes the memory service's health endpoint.
    pub async fn is_available(&self) -> bool {
        if !self.enabled {
            return false;
        }
        match self
            .client
            .get(format!("{}/health", self.endpoint))
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                debug!(error = %e, "memory service unavailable");
                false
            }
        }
    }

    /// Stores a resolved debate. Failures are logged and swallowed.
    pub async fn store_debate(&self, record: &DebateRecord) {
        if !self.enabled {
            return;
        }
        match self
            .client
            .post(format!("{}/debates", self.endpoint))
            .json(record)
            .send()
            .await
        {
            Ok(resp) if !resp.status().is_success() => {
                debug!(status = %resp.status(), "memory service rejected debate record");
            }
            Ok(_) => debug!(debate_id = record.debate_id.as_str(), "debate stored in memory"),
            Err(e) => debug!(error = %e, "failed to store debate in memory"),
        }
    }

    /// Queries debates relevant to a topic. Returns an empty list on any
    /// failure.
    pub async fn query_relevant(&self, topic: &str, top_k: usize) -> Vec<RetrievedDebate> {
        if !self.enabled {
            return Vec::new();
        }
        let result = self
            .client
            .get(format!("{}/debates/search", self.endpoint))
            .query(&[("q", topic), ("top_k", &top_k.to_string())])
            .send()
            .await;

        match result {
            Ok(resp) if resp.status().is_success() => {
                resp.json::<Vec<RetrievedDebate>>().await.unwrap_or_default()
            }
            Ok(resp) => {
                debug!(status = %resp.status(), "memory search rejected");
                Vec::new()
            }
            Err(e) => {
                debug!(error = %e, "memory search failed");
                Vec::new()
            }
        }
    }
}
