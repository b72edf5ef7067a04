// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Agent binary detection: probe every catalogue agent's `bin` on PATH.

use std::path::PathBuf;

use liftoff_exec::find_executable;
use liftoff_registry::{Index, IndexEntry};
use tracing::debug;

#[derive(Debug)]
pub struct DetectedAgent<'a> {
    pub name: &'a str,
    pub entry: &'a IndexEntry,
    /// Where the executable was found.
    pub path: PathBuf,
}

/// Catalogue agents whose executable is installed, in catalogue order.
pub fn detect_agents(index: &Index) -> Vec<DetectedAgent<'_>> {
    index
        .agents
        .iter()
        .filter(|(_, entry)| !entry.bin.is_empty())
        .filter_map(|(name, entry)| {
            let path = find_executable(&entry.bin)?;
            debug!(agent = %name, bin = %entry.bin, path = %path.display(), "detected agent");
            Some(DetectedAgent {
                name,
                entry,
                path,
            })
        })
        .collect()
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
