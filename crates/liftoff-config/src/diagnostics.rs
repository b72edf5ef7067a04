// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Precise configuration diagnostics.
//!
//! Parse and validation failures carry the offending file, the line/column
//! when known, and a ±2-line excerpt of the source around the offending
//! token. The excerpt is rendered in `Display` so `anyhow` chains print it
//! without any extra plumbing at the call sites.

use std::fmt;
use std::path::{Path, PathBuf};

/// How many lines of context to show on each side of the offending line.
const EXCERPT_RADIUS: usize = 2;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A file failed to parse as YAML.
    #[error("{0}")]
    Parse(Diagnostic),
    /// The parsed value violates the schema (empty UTD triple, dangling
    /// reference, wrong type).
    #[error("{0}")]
    Invalid(Diagnostic),
    #[error("reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A single located diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub file: PathBuf,
    pub line: Option<usize>,
    pub column: Option<usize>,
    pub message: String,
    /// Pre-rendered source excerpt; empty when the source is unavailable.
    pub excerpt: String,
}

impl Diagnostic {
    /// Build a diagnostic from a `serde_yaml` error, extracting the location
    /// and slicing the excerpt out of `source_text`.
    pub fn from_yaml(file: &Path, source_text: &str, err: &serde_yaml::Error) -> Self {
        let location = err.location();
        let line = location.as_ref().map(|l| l.line());
        let column = location.as_ref().map(|l| l.column());
        let excerpt = line
            .map(|l| render_excerpt(source_text, l))
            .unwrap_or_default();
        Self {
            file: file.to_path_buf(),
            line,
            column,
            message: err.to_string(),
            excerpt,
        }
    }

    /// Build an unlocated validation diagnostic attributed to `file`.
    pub fn validation(file: &Path, message: impl Into<String>) -> Self {
        Self {
            file: file.to_path_buf(),
            line: None,
            column: None,
            message: message.into(),
            excerpt: String::new(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.line, self.column) {
            (Some(l), Some(c)) => write!(f, "{}:{l}:{c}: {}", self.file.display(), self.message)?,
            (Some(l), None) => write!(f, "{}:{l}: {}", self.file.display(), self.message)?,
            _ => write!(f, "{}: {}", self.file.display(), self.message)?,
        }
        if !self.excerpt.is_empty() {
            write!(f, "\n{}", self.excerpt)?;
        }
        Ok(())
    }
}

/// Render a gutter-numbered excerpt centred on `line` (1-based), marking the
/// offending line with `>`.
fn render_excerpt(source: &str, line: usize) -> String {
    let lines: Vec<&str> = source.lines().collect();
    if line == 0 || lines.is_empty() {
        return String::new();
    }
    let idx = line.saturating_sub(1).min(lines.len() - 1);
    let start = idx.saturating_sub(EXCERPT_RADIUS);
    let end = (idx + EXCERPT_RADIUS + 1).min(lines.len());
    let width = format!("{end}").len();

    let mut out = String::new();
    for (i, text) in lines[start..end].iter().enumerate() {
        let n = start + i + 1;
        let marker = if n == line { '>' } else { ' ' };
        out.push_str(&format!("{marker} {n:>width$} | {text}\n"));
    }
    out.pop();
    out
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "agents:\n  claude:\n    bin: [oops\n    command: x\nroles: {}\n";

    #[test]
    fn yaml_error_carries_location_and_excerpt() {
        let err = serde_yaml::from_str::<serde_yaml::Value>(SOURCE).unwrap_err();
        let diag = Diagnostic::from_yaml(Path::new("a.yaml"), SOURCE, &err);
        assert!(diag.line.is_some());
        assert!(!diag.excerpt.is_empty());
        let rendered = diag.to_string();
        assert!(rendered.starts_with("a.yaml:"));
        assert!(rendered.contains(" | "));
    }

    #[test]
    fn excerpt_is_centred_with_marker() {
        let src = "l1\nl2\nl3\nl4\nl5\nl6\nl7";
        let ex = render_excerpt(src, 4);
        assert!(ex.contains("> 4 | l4"));
        assert!(ex.contains("  2 | l2"));
        assert!(ex.contains("  6 | l6"));
        assert!(!ex.contains("l1"));
        assert!(!ex.contains("l7"));
    }

    #[test]
    fn excerpt_clamps_at_file_start() {
        let ex = render_excerpt("only\ntwo", 1);
        assert!(ex.contains("> 1 | only"));
        assert!(ex.contains("  2 | two"));
    }

    #[test]
    fn validation_diagnostic_has_no_location() {
        let diag = Diagnostic::validation(Path::new("b.yaml"), "contexts.env: bad");
        assert_eq!(diag.to_string(), "b.yaml: contexts.env: bad");
    }
}
