// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! The UTD placeholder dialect: `{{.name}}` with optional interior
//! whitespace. Unknown placeholders render as empty so documentation-like
//! content containing brace sequences passes through without errors.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\{\{\s*\.([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("placeholder regex")
    })
}

/// Substitute every `{{.name}}` in `template` from `vars`.
/// Names missing from `vars` are replaced with the empty string.
pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
    if !template.contains("{{") {
        return template.to_string();
    }
    placeholder_re()
        .replace_all(template, |caps: &regex::Captures<'_>| {
            vars.get(&caps[1]).cloned().unwrap_or_default()
        })
        .into_owned()
}

/// True when `template` contains the literal placeholder for `name`,
/// tolerating whitespace variants (`{{ .name }}`).
///
/// This drives the laziness contract: file reads and subprocess runs only
/// happen when the template actually demands their output.
pub fn references(template: &str, name: &str) -> bool {
    placeholder_re()
        .captures_iter(template)
        .any(|caps| &caps[1] == name)
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
