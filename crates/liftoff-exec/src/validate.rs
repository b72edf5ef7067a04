// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Post-render command validation.
//!
//! The rendered command must start with a locatable executable after any
//! leading `NAME=VALUE` environment assignments are skipped. This runs
//! before the handoff so a typo'd template fails with a pointed message
//! instead of a shell error inside the agent session.

use std::path::PathBuf;
use std::sync::OnceLock;

use regex::Regex;

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("no command: rendered template contains only environment assignments\n  rendered: {rendered}")]
    NoCommand { rendered: String },
    #[error("executable {executable:?} not found on PATH\n  rendered from template: {template}")]
    NotFound { executable: String, template: String },
    #[error("rendered template is empty\n  template: {template}")]
    Empty { template: String },
}

fn env_assignment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Quoting tolerated: FOO=bar, 'FOO=bar', FOO='bar', "FOO=bar".
    RE.get_or_init(|| {
        Regex::new(r#"^['"]?[A-Za-z_][A-Za-z0-9_]*=["']?"#).expect("env assignment regex")
    })
}

/// Locate an executable on PATH (or verify a path-form candidate directly).
pub fn find_executable(name: &str) -> Option<PathBuf> {
    which::which(name).ok()
}

/// Check that `rendered` names a real executable; returns its resolved
/// path. `template` is only used for error reporting.
pub fn validate_command(rendered: &str, template: &str) -> Result<PathBuf, CommandError> {
    let mut tokens = rendered.split_whitespace().peekable();
    if tokens.peek().is_none() {
        return Err(CommandError::Empty {
            template: template.to_string(),
        });
    }

    let executable = tokens.find(|t| !env_assignment_re().is_match(t));
    let Some(token) = executable else {
        return Err(CommandError::NoCommand {
            rendered: rendered.to_string(),
        });
    };

    let stripped = token.trim_matches(|c| c == '\'' || c == '"');
    find_executable(stripped).ok_or_else(|| CommandError::NotFound {
        executable: stripped.to_string(),
        template: template.to_string(),
    })
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
