// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Agent command templates.
//!
//! The dialect substitutes `{{.bin}}`, `{{.model}}`, `{{.role}}`,
//! `{{.role_file}}`, `{{.prompt}}`, `{{.date}}`. Substituted values are
//! already shell-quoted, so a template must not wrap placeholders in extra
//! quotes; the two common authoring mistakes are rejected before anything
//! is executed.

use std::sync::OnceLock;

use regex::Regex;

use crate::escape::shell_quote;

/// Placeholder names the command dialect knows.
const COMMAND_SLOTS: [&str; 6] = ["bin", "model", "role", "role_file", "prompt", "date"];

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TemplateError {
    /// `'{{.prompt}}'` or `"{{.role}}"` — substitution already quotes.
    #[error(
        "template wraps {found} in quotes, but substituted values are already shell-quoted\n  \
         template: {template}\n  use {corrected} without surrounding quotes"
    )]
    QuotedPlaceholder {
        template: String,
        found: String,
        corrected: String,
    },
    /// `{prompt}` instead of `{{.prompt}}`.
    #[error(
        "template uses {found} but templates require {corrected}\n  template: {template}"
    )]
    SingleBrace {
        template: String,
        found: String,
        corrected: String,
    },
}

/// A validated agent command template.
#[derive(Debug, Clone)]
pub struct CommandTemplate {
    template: String,
}

/// The substitution set for one launch. All fields are raw (unquoted)
/// values; quoting happens during render.
#[derive(Debug, Default)]
pub struct CommandVars {
    pub bin: String,
    pub model: String,
    pub role: String,
    pub role_file: String,
    pub prompt: String,
    pub date: String,
}

fn quoted_placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"['"](\{\{\s*\.[A-Za-z_][A-Za-z0-9_]*\s*\}\})['"]"#)
            .expect("quoted placeholder regex")
    })
}

fn single_brace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\{(bin|model|role_file|role|prompt|date)\}").expect("single brace regex")
    })
}

fn slot_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\{\{\s*\.([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("slot regex")
    })
}

impl CommandTemplate {
    /// Validate and wrap a template string. Both authoring mistakes fail
    /// here, before any subprocess is launched.
    pub fn parse(template: &str) -> Result<Self, TemplateError> {
        if let Some(caps) = quoted_placeholder_re().captures(template) {
            let inner = caps.get(1).map_or("", |m| m.as_str());
            return Err(TemplateError::QuotedPlaceholder {
                template: template.to_string(),
                found: caps.get(0).map_or("", |m| m.as_str()).to_string(),
                corrected: inner.to_string(),
            });
        }
        if let Some(caps) = single_brace_re().captures(template) {
            let name = caps.get(1).map_or("", |m| m.as_str());
            return Err(TemplateError::SingleBrace {
                template: template.to_string(),
                found: format!("{{{name}}}"),
                corrected: format!("{{{{.{name}}}}}"),
            });
        }
        Ok(Self {
            template: template.to_string(),
        })
    }

    /// Substitute all slots, shell-quoting every value. `bin` and
    /// `role_file` get tilde expansion first — a quoted `~` would reach the
    /// agent unexpanded.
    pub fn render(&self, vars: &CommandVars) -> String {
        let value_of = |name: &str| -> Option<&str> {
            match name {
                "bin" => Some(&vars.bin),
                "model" => Some(&vars.model),
                "role" => Some(&vars.role),
                "role_file" => Some(&vars.role_file),
                "prompt" => Some(&vars.prompt),
                "date" => Some(&vars.date),
                _ => None,
            }
        };
        slot_re()
            .replace_all(&self.template, |caps: &regex::Captures<'_>| {
                let name = &caps[1];
                let Some(raw) = value_of(name) else {
                    return String::new();
                };
                if name == "bin" || name == "role_file" {
                    shell_quote(shellexpand::tilde(raw).as_ref())
                } else {
                    shell_quote(raw)
                }
            })
            .into_owned()
    }

    /// Slot names the template actually references.
    pub fn referenced_slots(&self) -> Vec<&str> {
        COMMAND_SLOTS
            .iter()
            .copied()
            .filter(|slot| {
                slot_re()
                    .captures_iter(&self.template)
                    .any(|c| &c[1] == *slot)
            })
            .collect()
    }

    pub fn as_str(&self) -> &str {
        &self.template
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
