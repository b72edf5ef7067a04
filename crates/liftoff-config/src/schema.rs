// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Typed configuration schema.
//!
//! All entity maps are [`IndexMap`]s: iteration order is definition order
//! after unification, and prompt assembly depends on it.

use std::path::PathBuf;
use std::time::Duration;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Top-level configuration tree, the unified view over both scopes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub agents: IndexMap<String, Agent>,
    #[serde(default)]
    pub roles: IndexMap<String, Role>,
    #[serde(default)]
    pub contexts: IndexMap<String, ContextDef>,
    #[serde(default)]
    pub tasks: IndexMap<String, Task>,
    #[serde(default)]
    pub settings: Settings,
}

/// A named external agent CLI.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Agent {
    /// Executable name, probed on PATH during detection and validation.
    #[serde(default)]
    pub bin: String,
    /// Command template over `{{.bin}}`, `{{.model}}`, `{{.role}}`,
    /// `{{.role_file}}`, `{{.prompt}}`, `{{.date}}`.
    ///
    /// Substituted values are already shell-quoted; placeholders must not be
    /// wrapped in additional quotes.
    #[serde(default)]
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
    /// Model alias map. Values are either a bare model id or `{id: …}`.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub models: IndexMap<String, ModelRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A model alias target: `sonnet: claude-sonnet-4-5` or
/// `sonnet: {id: claude-sonnet-4-5}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModelRef {
    Id(String),
    Detailed { id: String },
}

impl ModelRef {
    pub fn id(&self) -> &str {
        match self {
            Self::Id(id) => id,
            Self::Detailed { id } => id,
        }
    }
}

/// The Unified Template Definition triple plus its execution parameters.
///
/// At least one of `file`, `command`, `prompt` must be set; an all-empty
/// triple fails validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Utd {
    /// Source file. `./`, `/`, `~` prefixes are filesystem paths;
    /// `@module/` resolves inside the origin module's cache directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// Command whose output feeds `{{.command_output}}`. Only run when the
    /// template references it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    /// Inline template text. Takes priority over `file` and `command` as
    /// the template source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    /// Shell used to run `command` (default `sh`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shell: Option<String>,
    /// Command timeout as a humantime string, e.g. `"30s"` or `"2m"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
}

impl Utd {
    /// True when all three of file/command/prompt are unset or blank.
    pub fn is_blank(&self) -> bool {
        let blank = |s: &Option<String>| s.as_deref().map_or(true, |v| v.trim().is_empty());
        blank(&self.file) && blank(&self.command) && blank(&self.prompt)
    }

    /// Parsed `timeout`, when present and well-formed.
    pub fn timeout_duration(&self) -> Option<Duration> {
        self.timeout
            .as_deref()
            .and_then(|t| humantime::parse_duration(t).ok())
    }
}

/// A system-prompt definition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Role {
    #[serde(flatten)]
    pub utd: Utd,
    /// When the role's `file` is missing: skip to the next role (`true`)
    /// or fail the run (`false`).
    #[serde(default)]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Exact versioned module path this role was installed from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
}

/// A prompt fragment selectable by name or tag.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContextDef {
    #[serde(flatten)]
    pub utd: Utd,
    /// Always included in every composition.
    #[serde(default)]
    pub required: bool,
    /// Included when no explicit tags are given, or via the `default`
    /// pseudo-tag.
    #[serde(default)]
    pub default: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
}

/// A workflow prompt, optionally bound to a role.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Task {
    #[serde(flatten)]
    pub utd: Utd,
    /// Role to select when this task launches (name in the roles map).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
}

/// Process-wide defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_agent: Option<String>,
    /// Resolved exactly like an explicit `--role` flag: a missing role here
    /// is a hard error, not a fallback candidate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_role: Option<String>,
    /// Registry base, e.g. `reg.liftoff.dev/liftoff/assets`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry: Option<String>,
    /// Default UTD command timeout (humantime string).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_timeout: Option<String>,
}

// ─── String classification ───────────────────────────────────────────────────

/// The three kinds of strings a UTD `file` field or a CLI selector can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind<'a> {
    /// Filesystem path: starts with `./`, `/`, or `~`.
    Path(&'a str),
    /// `@module/…` — the remainder, relative to the origin module root.
    Module(&'a str),
    /// A name in the configured entity namespace.
    Name(&'a str),
}

/// Classify a string per the path/module/name convention.
pub fn classify(s: &str) -> RefKind<'_> {
    if let Some(rest) = s.strip_prefix("@module/") {
        RefKind::Module(rest)
    } else if s.starts_with("./") || s.starts_with('/') || s.starts_with('~') {
        RefKind::Path(s)
    } else {
        RefKind::Name(s)
    }
}

/// Expand a filesystem path string: tilde first, then `./` relative to
/// `workdir`.
pub fn expand_path(s: &str, workdir: &std::path::Path) -> PathBuf {
    let expanded = shellexpand::tilde(s);
    let p = PathBuf::from(expanded.as_ref());
    if p.is_absolute() {
        p
    } else {
        workdir.join(p)
    }
}

// ─── Validation ──────────────────────────────────────────────────────────────

/// Check schema constraints that serde cannot express. Returns
/// `(entity key, message)` pairs; the loader attributes each to the file
/// that defined the entity.
pub fn validate(config: &Config) -> Vec<(String, String)> {
    let mut errors = Vec::new();
    let utd_err = "UTD requires at least one of file, command, or prompt";

    for (name, agent) in &config.agents {
        if agent.command.trim().is_empty() {
            errors.push((format!("agents.{name}"), "command must not be empty".into()));
        }
    }
    for (name, role) in &config.roles {
        if role.utd.is_blank() {
            errors.push((format!("roles.{name}"), utd_err.into()));
        }
        check_timeout(&role.utd, &format!("roles.{name}"), &mut errors);
    }
    for (name, ctx) in &config.contexts {
        if ctx.utd.is_blank() {
            errors.push((format!("contexts.{name}"), utd_err.into()));
        }
        check_timeout(&ctx.utd, &format!("contexts.{name}"), &mut errors);
    }
    for (name, task) in &config.tasks {
        if task.utd.is_blank() {
            errors.push((format!("tasks.{name}"), utd_err.into()));
        }
        check_timeout(&task.utd, &format!("tasks.{name}"), &mut errors);
        if let Some(role) = &task.role {
            if matches!(classify(role), RefKind::Name(_)) && !config.roles.contains_key(role) {
                errors.push((
                    format!("tasks.{name}"),
                    format!("references unknown role \"{role}\""),
                ));
            }
        }
    }
    if let Some(agent) = &config.settings.default_agent {
        if !config.agents.is_empty() && !config.agents.contains_key(agent) {
            errors.push((
                "settings.default_agent".into(),
                format!("references unknown agent \"{agent}\""),
            ));
        }
    }
    errors
}

fn check_timeout(utd: &Utd, key: &str, errors: &mut Vec<(String, String)>) {
    if let Some(t) = &utd.timeout {
        if humantime::parse_duration(t).is_err() {
            errors.push((key.to_string(), format!("invalid timeout \"{t}\"")));
        }
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
