// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Major-version selector resolution.
//!
//! A selector like `…@v0` asks for the newest published `v0.x.y`; a full
//! `…@v0.1.2` is already canonical and passes through.

use anyhow::{bail, Context};
use semver::Version;

/// Split a module reference into its path and an optional major selector.
///
/// `path@v0` → `(path, Some(0))`, `path@v1` → `(path, Some(1))`,
/// `path` → `(path, None)`. A full version (`@v0.1.2`) is rejected here;
/// callers pass those straight to `fetch`.
pub fn parse_selector(module: &str) -> anyhow::Result<(&str, Option<u64>)> {
    let (path, version) = crate::module::split_version(module);
    let Some(version) = version else {
        return Ok((path, None));
    };
    let digits = version
        .strip_prefix('v')
        .with_context(|| format!("version {version:?} must start with 'v'"))?;
    if digits.contains('.') {
        bail!("{module:?} is already a canonical version, not a major selector");
    }
    let major: u64 = digits
        .parse()
        .with_context(|| format!("invalid major selector {version:?}"))?;
    Ok((path, Some(major)))
}

/// Newest version, optionally constrained to one major line.
pub fn pick_latest(versions: &[Version], major: Option<u64>) -> Option<&Version> {
    versions
        .iter()
        .filter(|v| major.map_or(true, |m| v.major == m))
        .max()
}

/// Parse one `@v/list` line (`v0.1.2`) into a [`Version`].
pub fn parse_listed(line: &str) -> Option<Version> {
    Version::parse(line.trim().strip_prefix('v')?).ok()
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
