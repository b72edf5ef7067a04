// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! The registry catalogue: every installable asset grouped by category.

use indexmap::IndexMap;
use serde::Deserialize;

/// Parsed `index.yaml` of the well-known index module.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Index {
    #[serde(default)]
    pub agents: IndexMap<String, IndexEntry>,
    #[serde(default)]
    pub roles: IndexMap<String, IndexEntry>,
    #[serde(default)]
    pub tasks: IndexMap<String, IndexEntry>,
    #[serde(default)]
    pub contexts: IndexMap<String, IndexEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IndexEntry {
    /// Versioned module path, usually with a major selector (`…@v0`).
    pub module: String,
    /// Executable name, only meaningful for agents.
    #[serde(default)]
    pub bin: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Index {
    /// Category map by its config key (`agents`, `roles`, `tasks`,
    /// `contexts`).
    pub fn category(&self, name: &str) -> Option<&IndexMap<String, IndexEntry>> {
        match name {
            "agents" => Some(&self.agents),
            "roles" => Some(&self.roles),
            "tasks" => Some(&self.tasks),
            "contexts" => Some(&self.contexts),
            _ => None,
        }
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
