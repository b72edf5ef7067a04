// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! `@module/` file resolution.
//!
//! An installed asset's `origin` names the exact versioned module it came
//! from. A UTD `file` of `@module/<sub>` resolves inside that module's
//! cache extraction; when the exact version directory is gone (cache
//! trimmed, module re-resolved) the highest-semver sibling of the same
//! module steps in.

use std::path::{Path, PathBuf};

use liftoff_registry::{extract_dir, module_base_name, split_version};

/// Resolve `@module/<subpath>` for an asset with the given `origin`.
///
/// Returns `Err(warning)` instead of failing hard: the caller keeps the
/// original string so the eventual file-read error carries more context.
pub fn resolve_module_file(
    cache_root: &Path,
    origin: &str,
    subpath: &str,
) -> Result<PathBuf, String> {
    let exact = extract_dir(cache_root, origin);
    if exact.is_dir() {
        return Ok(exact.join(subpath));
    }

    let (path, _) = split_version(origin);
    let base = module_base_name(path);
    match highest_sibling(&cache_root.join("mod").join("extract").join(path), base) {
        Some(dir) => Ok(dir.join(subpath)),
        None => Err(format!(
            "cannot resolve @module/{subpath}: no cached extraction for {origin}"
        )),
    }
}

/// Among `<dir>/<base>@v*` siblings, the one with the highest semver.
fn highest_sibling(dir: &Path, base: &str) -> Option<PathBuf> {
    let prefix = format!("{base}@v");
    let entries = std::fs::read_dir(dir).ok()?;
    entries
        .filter_map(Result::ok)
        .filter(|e| e.path().is_dir())
        .filter_map(|e| {
            let name = e.file_name().to_string_lossy().into_owned();
            let version = semver::Version::parse(name.strip_prefix(&prefix)?).ok()?;
            Some((version, e.path()))
        })
        .max_by(|(a, _), (b, _)| a.cmp(b))
        .map(|(_, path)| path)
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
