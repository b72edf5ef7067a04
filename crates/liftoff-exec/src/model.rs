// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Effective-model resolution: flag override, else the agent's default,
//! with one pass through the agent's alias map.

use liftoff_config::Agent;

/// Resolve the model id to substitute into the command template.
///
/// Returns `None` when neither a flag nor `default_model` is set (the
/// `{{.model}}` slot then renders empty).
pub fn resolve_model(agent: &Agent, flag: Option<&str>) -> Option<String> {
    let name = flag.or(agent.default_model.as_deref())?;
    Some(
        agent
            .models
            .get(name)
            .map_or_else(|| name.to_string(), |m| m.id().to_string()),
    )
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
