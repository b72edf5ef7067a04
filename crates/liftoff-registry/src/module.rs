// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Versioned-module path arithmetic.
//!
//! A module path looks like
//! `reg.liftoff.dev/liftoff/assets/tasks/code-review@v0.1.2`: a host-rooted
//! slash path with an optional `@v…` suffix. Cached extractions live under
//! `<cache>/mod/extract/<path-sans-version>/<base>@<version>/`.

use std::path::{Path, PathBuf};

/// Split `path@version` into `(path, Some(version))`; a bare path returns
/// `(path, None)`.
pub fn split_version(module: &str) -> (&str, Option<&str>) {
    match module.rsplit_once('@') {
        Some((path, version)) if !version.is_empty() => (path, Some(version)),
        _ => (module, None),
    }
}

/// Final path segment of a version-less module path.
pub fn module_base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Directory a canonical versioned module extracts into.
pub fn extract_dir(cache_root: &Path, canonical: &str) -> PathBuf {
    let (path, version) = split_version(canonical);
    let base = module_base_name(path);
    let leaf = match version {
        Some(v) => format!("{base}@{v}"),
        None => base.to_string(),
    };
    cache_root.join("mod").join("extract").join(path).join(leaf)
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
