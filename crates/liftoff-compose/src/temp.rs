// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Temp-file discipline.
//!
//! Sources outside the working directory (typically cached registry
//! modules) are copied into `./.liftoff/temp/` under deterministic names so
//! the launched agent can read them without knowing the cache layout. The
//! artefacts deliberately outlive the process; nothing here deletes them.

use std::path::{Component, Path, PathBuf};

use anyhow::Context;

use liftoff_config::APP_NAME;

pub struct TempManager {
    temp_dir: PathBuf,
    workdir: PathBuf,
}

impl TempManager {
    pub fn new(workdir: &Path) -> Self {
        Self {
            temp_dir: workdir.join(format!(".{APP_NAME}")).join("temp"),
            workdir: workdir.to_path_buf(),
        }
    }

    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    /// Deterministic artefact path: `<kind>-<name>.<ext>`, slashes in the
    /// name flattened to dashes, the source extension preserved.
    pub fn deterministic_path(&self, kind: &str, name: &str, ext: Option<&str>) -> PathBuf {
        let flat = name.replace('/', "-");
        let file = match ext {
            Some(e) if !e.is_empty() => format!("{kind}-{flat}.{e}"),
            _ => format!("{kind}-{flat}"),
        };
        self.temp_dir.join(file)
    }

    /// Copy `source` to its deterministic location, overwriting on reuse.
    pub fn stage_file(&self, kind: &str, name: &str, source: &Path) -> anyhow::Result<PathBuf> {
        let ext = source.extension().and_then(|e| e.to_str());
        let dest = self.deterministic_path(kind, name, ext);
        std::fs::create_dir_all(&self.temp_dir)
            .with_context(|| format!("creating {}", self.temp_dir.display()))?;
        std::fs::copy(source, &dest).with_context(|| {
            format!("copying {} to {}", source.display(), dest.display())
        })?;
        Ok(dest)
    }

    /// Write rendered text (e.g. an inline role) to its deterministic
    /// location.
    pub fn write_inline(&self, kind: &str, name: &str, text: &str) -> anyhow::Result<PathBuf> {
        let dest = self.deterministic_path(kind, name, Some("md"));
        std::fs::create_dir_all(&self.temp_dir)
            .with_context(|| format!("creating {}", self.temp_dir.display()))?;
        std::fs::write(&dest, text).with_context(|| format!("writing {}", dest.display()))?;
        Ok(dest)
    }

    /// True when `file` lies outside the working directory and therefore
    /// needs a staged copy.
    pub fn needs_staging(&self, file: &Path) -> bool {
        is_outside(&self.workdir, file)
    }

    /// Best-effort check that the temp directory is git-ignored: find the
    /// nearest `.gitignore` walking up from the workdir and look for a
    /// `.liftoff` entry. Returns a warning when one is missing.
    pub fn gitignore_warning(&self) -> Option<String> {
        let gitignore = self
            .workdir
            .ancestors()
            .map(|dir| dir.join(".gitignore"))
            .find(|p| p.is_file())?;
        let text = std::fs::read_to_string(&gitignore).ok()?;
        let ignored = text.lines().map(str::trim).any(|line| {
            matches!(
                line,
                ".liftoff" | ".liftoff/" | "/.liftoff" | "/.liftoff/" | ".liftoff/temp" | ".liftoff/temp/"
            )
        });
        if ignored {
            None
        } else {
            Some(format!(
                "{} does not ignore .liftoff/ — temp artefacts will show up in git status",
                gitignore.display()
            ))
        }
    }

    /// Fresh dry-run directory `<tmp>/liftoff-<yyyymmddhhmmss>/`,
    /// suffixed `-N` on collision.
    pub fn dry_run_dir() -> anyhow::Result<PathBuf> {
        let stamp = chrono::Local::now().format("%Y%m%d%H%M%S");
        let base = std::env::temp_dir().join(format!("{APP_NAME}-{stamp}"));
        let mut candidate = base.clone();
        let mut suffix = 1;
        while candidate.exists() {
            candidate = PathBuf::from(format!("{}-{suffix}", base.display()));
            suffix += 1;
        }
        std::fs::create_dir_all(&candidate)
            .with_context(|| format!("creating {}", candidate.display()))?;
        Ok(candidate)
    }
}

/// Lexically normalise a path: drop `.`, resolve `..` against preceding
/// components. No filesystem access.
pub fn clean_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Prefix comparison of cleaned paths: is `file` outside `workdir`?
pub fn is_outside(workdir: &Path, file: &Path) -> bool {
    !clean_path(file).starts_with(clean_path(workdir))
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
