// SPDX-FileCopyrightText: 2026 Roundtable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Destructive-operation detection for executor output.
//!
//! The execution prompt requires the executor to ask before destructive
//! action; this module backs that up by scanning its output for known
//! destructive patterns (recursive deletes, force pushes, DROP TABLE,
//! service kills, permission bombs) and producing a warning block for the
//! transcript.

use std::sync::OnceLock;

use regex::Regex;

/// Destructive patterns with human-readable labels.
const DESTRUCTIVE_PATTERNS: &[(&str, &str)] = &[
    // File operations
    (r"rm\s+-rf", "recursive force delete"),
    (r"rm\s+\S*-r", "recursive delete"),
    (r"unlink", "file unlink"),
    // Git operations
    (r"git\s+push\s+--force", "git force push"),
    (r"git\s+push\s+-f\b", "git force push"),
    (r"git\s+reset\s+--hard", "git hard reset"),
    (r"git\s+clean", "git clean"),
    (r"git\s+branch\s+-D", "git branch force delete"),
    // Database operations
    (r"DROP\s+TABLE", "drop table"),
    (r"DROP\s+DATABASE", "drop database"),
    (r"TRUNCATE", "table truncate"),
    (r"DELETE\s+FROM\s+\w+\s*;", "unfiltered delete"),
    // Service operations
    (r"systemctl\s+stop", "service stop"),
    (r"systemctl\s+disable", "service disable"),
    (r"kill\s+-9", "force kill"),
    (r"pkill", "process kill"),
    // Credential/config operations
    (r"chmod\s+777", "world-writable permissions"),
    (r"chown\s+\S*root", "root ownership change"),
];

fn compiled() -> &'static Vec<(Regex, &'static str)> {
    static PATTERNS: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        DESTRUCTIVE_PATTERNS
            .iter()
            .map(|(pattern, label)| {
                (
                    Regex::new(&format!("(?i){pattern}")).expect("destructive pattern"),
                    *label,
                )
            })
            .collect()
    })
}

/// Returns the labels of all destructive patterns found in `content`.
pub fn detect_destructive(content: &str) -> Vec<&'static str> {
    let mut found = Vec::new();
    for (regex, label) in compiled() {
        if regex.is_match(content) && !found.contains(label) {
            found.push(*label);
        }
    }
    found
}

/// Whether the content warrants an explicit confirmation step.
pub fn requires_confirmation(content: &str) -> bool {
    !detect_destructive(content).is_empty()
}

/// Formats the warning block appended to the transcript.
pub fn format_warning(patterns: &[&str]) -> String {
    let mut out =
        String::from("WARNING: the executor's plan contains destructive operations:\n");
    for pattern in patterns {
        out.push_str(&format!("  - {pattern}\n"));
    }
    out.push_str("Confirm explicitly before allowing it to proceed.");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_recursive_delete() {
        let found = detect_destructive("I will run rm -rf ./build to clean up");
        assert!(found.contains(&"recursive force delete"));
    }

    #[test]
    fn detects_git_force_push_case_insensitive() {
        assert!(requires_confirmation("then GIT PUSH --FORCE origin main"));
        assert!(requires_confirmation("git push -f origin main"));
    }

    #[test]
    fn detects_sql_destruction() {
        let found = detect_destructive("DROP TABLE users; then TRUNCATE logs;");
        assert!(found.contains(&"drop table"));
        assert!(found.contains(&"table truncate"));
    }

    #[test]
    fn benign_plans_pass() {
        assert!(!requires_confirmation(
            "I will add a new module, write tests, and run cargo check."
        ));
        assert!(detect_destructive("reading files and summarizing").is_empty());
    }

    #[test]
    fn duplicate_patterns_are_reported_once() {
        let found = detect_destructive("rm -rf a; rm -rf b");
        assert_eq!(
            found.iter().filter(|l| **l == "recursive force delete").count(),
            1
        );
    }

    #[test]
    fn warning_lists_each_pattern() {
        let warning = format_warning(&["drop table", "force kill"]);
        assert!(warning.contains("WARNING"));
        assert!(warning.contains("- drop table"));
        assert!(warning.contains("- force kill"));
        assert!(warning.contains("Confirm explicitly"));
    }
}
