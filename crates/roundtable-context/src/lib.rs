// SPDX-FileCopyrightText: 2026 Roundtable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Path-safe context loading for debates.
//!
//! Files shared into a debate become visible to every backend, so loading
//! is guarded before any read: sensitive paths (ssh keys, cloud
//! credentials, `.env`, private keys) are denied, traversal components are
//! rejected, and content is capped at 1 MiB. Loaded text is formatted with
//! a path header, line numbers for recognized source files, and directory
//! arguments become a depth-limited tree.

use std::fmt::Write as _;
use std::path::{Component, Path, PathBuf};

use roundtable_core::RoundtableError;
use tracing::debug;

/// Maximum file size loaded into context (1 MiB).
pub const MAX_FILE_SIZE: u64 = 1024 * 1024;

/// Maximum directory tree depth for summaries.
const MAX_TREE_DEPTH: usize = 3;

// Paths that must never be loaded, matched as lowercase substrings of the
// absolute path.
const SENSITIVE_PATTERNS: &[&str] = &[
    "/.ssh/",
    "/.gnupg/",
    "/.aws/",
    "/.config/gcloud",
    "/etc/shadow",
    "/etc/passwd",
    "/.netrc",
    "/.npmrc",
    "/.pypirc",
    "/credentials",
    "/secrets",
    "/.env",
    ".pem",
    ".key",
    "id_rsa",
    "id_ed25519",
    "id_ecdsa",
    "id_dsa",
];

const EXCLUDED_DIRS: &[&str] = &[
    "node_modules",
    "vendor",
    "__pycache__",
    ".git",
    ".svn",
    ".hg",
    "target",
    "build",
    "dist",
    "bin",
    "obj",
    ".idea",
    ".vscode",
    ".cache",
    "venv",
    ".venv",
    "env",
    ".env",
];

const CODE_EXTENSIONS: &[&str] = &[
    "rs", "go", "py", "js", "ts", "jsx", "tsx", "c", "h", "cpp", "hpp", "java", "rb", "php",
    "sh", "bash", "zsh", "yaml", "yml", "json", "toml", "sql", "lua", "vim", "el", "lisp",
    "zig", "nim", "swift", "kt", "scala", "ml", "hs",
];

/// Validates a path before any filesystem read.
///
/// Rejects traversal components, nonexistent paths, and sensitive paths.
pub fn validate_path(path: &Path) -> Result<PathBuf, RoundtableError> {
    if path
        .components()
        .any(|c| matches!(c, Component::ParentDir))
    {
        return Err(RoundtableError::ContextFile(
            "path traversal not allowed".to_string(),
        ));
    }

    let abs = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|e| RoundtableError::ContextFile(format!("cannot resolve path: {e}")))?
            .join(path)
    };

    if !abs.exists() {
        return Err(RoundtableError::ContextFile(format!(
            "path does not exist: {}",
            abs.display()
        )));
    }

    if is_sensitive_path(&abs) {
        return Err(RoundtableError::ContextFile(
            "access to sensitive path denied".to_string(),
        ));
    }

    Ok(abs)
}

/// Reads file content with the size cap applied before the read.
pub fn load_file(path: &Path) -> Result<String, RoundtableError> {
    let abs = validate_path(path)?;

    let meta = std::fs::metadata(&abs)
        .map_err(|e| RoundtableError::ContextFile(format!("failed to stat file: {e}")))?;

    if meta.is_dir() {
        return Err(RoundtableError::ContextFile(
            "path is a directory, use summarize_dir instead".to_string(),
        ));
    }

    if meta.len() > MAX_FILE_SIZE {
        return Err(RoundtableError::ContextFile(format!(
            "file too large ({} bytes, max {MAX_FILE_SIZE})",
            meta.len()
        )));
    }

    std::fs::read_to_string(&abs)
        .map_err(|e| RoundtableError::ContextFile(format!("failed to read file: {e}")))
}

/// Formats file content for model context with a path header, adding line
/// numbers for recognized source files.
pub fn format_for_context(path: &Path, content: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== File: {} ===", path.display());

    if is_code_file(path) {
        for (i, line) in content.lines().enumerate() {
            let _ = writeln!(out, "{:4} | {}", i + 1, line);
        }
    } else {
        out.push_str(content);
        if !content.ends_with('\n') {
            out.push('\n');
        }
    }

    let base = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let _ = writeln!(out, "=== End: {base} ===");
    out
}

/// Returns a depth-limited tree of a directory, skipping hidden entries and
/// well-known build/VCS directories.
pub fn summarize_dir(path: &Path) -> Result<String, RoundtableError> {
    let abs = validate_path(path)?;

    if !abs.is_dir() {
        return Err(RoundtableError::ContextFile(
            "path is not a directory".to_string(),
        ));
    }

    let mut out = String::new();
    let _ = writeln!(out, "=== Directory: {} ===", abs.display());
    walk_dir(&abs, "", &mut out, 0, MAX_TREE_DEPTH)?;
    Ok(out)
}

fn walk_dir(
    path: &Path,
    prefix: &str,
    out: &mut String,
    depth: usize,
    max_depth: usize,
) -> Result<(), RoundtableError> {
    if depth > max_depth {
        let _ = writeln!(out, "{prefix}  ...");
        return Ok(());
    }

    let mut entries: Vec<_> = match std::fs::read_dir(path) {
        Ok(rd) => rd.filter_map(Result::ok).collect(),
        Err(e) => {
            return Err(RoundtableError::ContextFile(format!(
                "cannot read directory {}: {e}",
                path.display()
            )))
        }
    };

    // Directories first, then files, each alphabetical.
    entries.sort_by_key(|e| {
        let is_dir = e.file_type().map(|t| t.is_dir()).unwrap_or(false);
        (!is_dir, e.file_name())
    });

    let filtered: Vec<_> = entries
        .into_iter()
        .filter(|e| {
            let name = e.file_name().to_string_lossy().into_owned();
            !name.starts_with('.') && !EXCLUDED_DIRS.contains(&name.as_str())
        })
        .collect();

    let count = filtered.len();
    for (i, entry) in filtered.into_iter().enumerate() {
        let is_last = i == count - 1;
        let connector = if is_last { "`-" } else { "|-" };
        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);

        let mut name = entry.file_name().to_string_lossy().into_owned();
        if is_dir {
            name.push('/');
        }
        let _ = writeln!(out, "{prefix}{connector} {name}");

        if is_dir {
            let child_prefix = if is_last {
                format!("{prefix}  ")
            } else {
                format!("{prefix}| ")
            };
            if walk_dir(&entry.path(), &child_prefix, out, depth + 1, max_depth).is_err() {
                // Permission errors mid-tree are noted, not fatal.
                let _ = writeln!(out, "{child_prefix}  (error reading)");
            }
        }
    }

    Ok(())
}

/// Loads a file or directory summary and formats it for context.
///
/// This is the main integration point for the `AddContext` command.
pub fn load_context(path: &Path) -> Result<String, RoundtableError> {
    let abs = validate_path(path)?;
    debug!(path = %abs.display(), "loading context");

    if abs.is_dir() {
        summarize_dir(&abs)
    } else {
        let content = load_file(&abs)?;
        Ok(format_for_context(&abs, &content))
    }
}

fn is_code_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| CODE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn is_sensitive_path(path: &Path) -> bool {
    let lower = path.display().to_string().to_lowercase();
    SENSITIVE_PATTERNS.iter().any(|p| lower.contains(p))
}
