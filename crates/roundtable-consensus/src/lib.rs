// SPDX-FileCopyrightText: 2026 Roundtable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Consensus analysis for debate rounds.
//!
//! Models declare positions with a small closed vocabulary: `AGREE:`
//! (optionally naming the model agreed with), `OBJECT:` with a reason, and
//! `ADD:` with an additional point. This crate parses individual replies
//! into [`ParsedPosition`]s and aggregates the latest round into a
//! [`ConsensusResult`].
//!
//! The analyzer is pure: the same input sequence always produces the same
//! result, independent of timing or external state.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use strum::Display;

use roundtable_core::TranscriptMessage;

/// A model's stance in the debate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "lowercase")]
pub enum Position {
    #[default]
    Unknown,
    Agree,
    Object,
    Add,
}

/// The detected position and extracted content for one reply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedPosition {
    pub position: Position,
    /// For AGREE: which model they agree with, if named.
    pub target: Option<String>,
    /// For OBJECT: the objection reason.
    pub reason: Option<String>,
    /// For ADD: the additional point.
    pub point: Option<String>,
    /// True when an explicit marker matched; false for keyword-fallback
    /// matches, which are advisory only.
    pub explicit: bool,
}

struct Patterns {
    agree: Regex,
    object: Regex,
    add: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        agree: Regex::new(r"(?i)AGREE:\s*\[?([^\]\n]+)\]?").expect("agree pattern"),
        object: Regex::new(r"(?i)OBJECT:\s*([^\n]+)").expect("object pattern"),
        add: Regex::new(r"(?i)ADD:\s*([^\n]+)").expect("add pattern"),
    })
}

// Fallback keywords for implicit positions. Matches are advisory: explicit
// markers always take priority.
const AGREE_KEYWORDS: &[&str] = &[
    "i agree",
    "agreed",
    "concur",
    "support this",
    "that's correct",
    "exactly right",
];
const OBJECT_KEYWORDS: &[&str] = &[
    "i disagree",
    "i object",
    "however",
    "but i think",
    "that's wrong",
    "incorrect",
];
const ADD_KEYWORDS: &[&str] = &[
    "i would add",
    "additionally",
    "also consider",
    "one more thing",
    "to expand on",
];

/// Parses a model reply into a structured position.
///
/// Explicit markers take priority over keyword fallback; a reply with no
/// recognizable signal parses as [`Position::Unknown`].
pub fn parse_response(content: &str) -> ParsedPosition {
    let p = patterns();

    if let Some(caps) = p.agree.captures(content) {
        return ParsedPosition {
            position: Position::Agree,
            target: Some(caps[1].trim().to_string()),
            explicit: true,
            ..ParsedPosition::default()
        };
    }

    if let Some(caps) = p.object.captures(content) {
        return ParsedPosition {
            position: Position::Object,
            reason: Some(caps[1].trim().to_string()),
            explicit: true,
            ..ParsedPosition::default()
        };
    }

    if let Some(caps) = p.add.captures(content) {
        return ParsedPosition {
            position: Position::Add,
            point: Some(caps[1].trim().to_string()),
            explicit: true,
            ..ParsedPosition::default()
        };
    }

    let lower = content.to_lowercase();
    for (keywords, position) in [
        (AGREE_KEYWORDS, Position::Agree),
        (OBJECT_KEYWORDS, Position::Object),
        (ADD_KEYWORDS, Position::Add),
    ] {
        if keywords.iter().any(|kw| lower.contains(kw)) {
            return ParsedPosition {
                position,
                ..ParsedPosition::default()
            };
        }
    }

    ParsedPosition::default()
}

/// Round-level consensus aggregation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusResult {
    pub has_consensus: bool,
    pub agree_count: usize,
    pub object_count: usize,
    pub add_count: usize,
    pub unknown_count: usize,
    pub total_count: usize,
    /// Most agreed-upon model, ties broken by first occurrence.
    pub agreement_target: Option<String>,
    /// Objection reasons in model order.
    pub objections: Vec<String>,
    /// Additional points in model order.
    pub additions: Vec<String>,
}

/// Aggregates an ordered list of `(model_id, position)` pairs.
///
/// Consensus requires a strict majority of AGREE positions and zero
/// objections. ADD is neutral; UNKNOWN counts only toward the total.
pub fn analyze_positions(positions: &[(String, ParsedPosition)]) -> ConsensusResult {
    let mut result = ConsensusResult {
        total_count: positions.len(),
        ..ConsensusResult::default()
    };

    if positions.is_empty() {
        return result;
    }

    // Target id -> count, first-seen order preserved for stable tie-breaks.
    let mut target_counts: Vec<(String, usize)> = Vec::new();

    for (_, parsed) in positions {
        match parsed.position {
            Position::Agree => {
                result.agree_count += 1;
                if let Some(ref target) = parsed.target {
                    match target_counts.iter_mut().find(|(t, _)| t == target) {
                        Some((_, count)) => *count += 1,
                        None => target_counts.push((target.clone(), 1)),
                    }
                }
            }
            Position::Object => {
                result.object_count += 1;
                if let Some(ref reason) = parsed.reason {
                    result.objections.push(reason.clone());
                }
            }
            Position::Add => {
                result.add_count += 1;
                if let Some(ref point) = parsed.point {
                    result.additions.push(point.clone());
                }
            }
            Position::Unknown => result.unknown_count += 1,
        }
    }

    // Strict greater-than keeps the first-seen target on ties.
    let mut best: Option<(&str, usize)> = None;
    for (target, count) in &target_counts {
        if best.map_or(true, |(_, c)| *count > c) {
            best = Some((target.as_str(), *count));
        }
    }
    result.agreement_target = best.map(|(target, _)| target.to_string());

    let majority = positions.len() / 2 + 1;
    result.has_consensus = result.agree_count >= majority && result.object_count == 0;

    result
}

/// Extracts the latest round's positions from an ordered transcript.
///
/// The latest round is every non-system, non-user message after the most
/// recent `user` message. A model that spoke more than once keeps its
/// first-seen order but its last position wins.
pub fn latest_round_positions(
    messages: &[TranscriptMessage],
) -> Vec<(String, ParsedPosition)> {
    let last_user = match messages.iter().rposition(|m| m.source == "user") {
        Some(idx) => idx,
        None => return Vec::new(),
    };

    let mut positions: Vec<(String, ParsedPosition)> = Vec::new();
    for msg in &messages[last_user + 1..] {
        if msg.source == "system" || msg.source == "user" {
            continue;
        }
        let parsed = parse_response(&msg.content);
        match positions.iter_mut().find(|(id, _)| *id == msg.source) {
            Some((_, existing)) => *existing = parsed,
            None => positions.push((msg.source.clone(), parsed)),
        }
    }
    positions
}

/// Scores the latest round of an ordered transcript.
pub fn analyze_round(messages: &[TranscriptMessage]) -> ConsensusResult {
    analyze_positions(&latest_round_positions(messages))
}

/// Majority consensus: `agree >= floor(total/2)+1` and no objections.
pub fn check_consensus(positions: &[(String, ParsedPosition)]) -> bool {
    analyze_positions(positions).has_consensus
}

/// Strict consensus: every position is AGREE or ADD, with at least one AGREE.
pub fn strict_consensus(positions: &[(String, ParsedPosition)]) -> bool {
    if positions.is_empty() {
        return false;
    }
    let all_supportive = positions
        .iter()
        .all(|(_, p)| matches!(p.position, Position::Agree | Position::Add));
    let any_agree = positions
        .iter()
        .any(|(_, p)| p.position == Position::Agree);
    all_supportive && any_agree
}
