// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Context selection.
//!
//! The resolved list is assembled in a fixed order — required, defaults,
//! then user-supplied tags in their given sequence — with first-occurrence
//! deduplication. Definition order of the configuration is preserved inside
//! each group.

use liftoff_config::{classify, Config, ContextDef, RefKind};

/// What the caller asked for.
#[derive(Debug, Clone, Default)]
pub struct ContextRequest {
    pub include_required: bool,
    pub include_defaults: bool,
    /// Tag sequence exactly as supplied on the command line.
    pub tags: Vec<String>,
}

/// One selected context.
#[derive(Debug)]
pub enum Pick<'a> {
    /// A configured context, by name.
    Named { name: &'a str, def: &'a ContextDef },
    /// An ad-hoc filesystem path supplied as a selector.
    File { spec: String },
}

impl Pick<'_> {
    pub fn display_name(&self) -> &str {
        match self {
            Pick::Named { name, .. } => name,
            Pick::File { spec } => spec,
        }
    }
}

#[derive(Debug, Default)]
pub struct SelectionOutcome<'a> {
    pub picks: Vec<Pick<'a>>,
    /// Defaults that did not make the cut, reported as `skipped` for UIs.
    pub skipped_defaults: Vec<&'a str>,
    pub warnings: Vec<String>,
}

/// The pseudo-tag that pulls in every `default = true` context.
const DEFAULT_PSEUDO_TAG: &str = "default";

pub fn select_contexts<'a>(config: &'a Config, req: &ContextRequest) -> SelectionOutcome<'a> {
    let mut out = SelectionOutcome::default();
    let mut seen: Vec<&str> = Vec::new();

    let mut push_named = |name: &'a str, def: &'a ContextDef, picks: &mut Vec<Pick<'a>>| {
        if !seen.contains(&name) {
            seen.push(name);
            picks.push(Pick::Named { name, def });
        }
    };

    if req.include_required {
        for (name, def) in &config.contexts {
            if def.required {
                push_named(name, def, &mut out.picks);
            }
        }
    }

    if req.include_defaults && req.tags.is_empty() {
        for (name, def) in &config.contexts {
            if def.default {
                push_named(name, def, &mut out.picks);
            }
        }
    }

    for tag in &req.tags {
        match classify(tag) {
            RefKind::Path(spec) => {
                if !out.picks.iter().any(|p| p.display_name() == spec) {
                    out.picks.push(Pick::File { spec: spec.to_string() });
                }
            }
            RefKind::Module(_) => {
                // `@module/` only resolves for installed assets carrying an
                // origin; a raw selector cannot name one.
                out.warnings
                    .push(format!("selector \"{tag}\" is not valid outside an installed asset"));
            }
            RefKind::Name(name) if name == DEFAULT_PSEUDO_TAG => {
                for (name, def) in &config.contexts {
                    if def.default {
                        push_named(name, def, &mut out.picks);
                    }
                }
            }
            RefKind::Name(name) => {
                if let Some((key, def)) = config.contexts.get_key_value(name) {
                    push_named(key, def, &mut out.picks);
                    continue;
                }
                let mut matched = false;
                for (key, def) in &config.contexts {
                    if def.tags.iter().any(|t| t == name) {
                        push_named(key, def, &mut out.picks);
                        matched = true;
                    }
                }
                if !matched {
                    out.warnings
                        .push(format!("no context matches selector \"{name}\""));
                }
            }
        }
    }

    for (name, def) in &config.contexts {
        if def.default && !seen.contains(&name.as_str()) {
            out.skipped_defaults.push(name);
        }
    }

    out
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
