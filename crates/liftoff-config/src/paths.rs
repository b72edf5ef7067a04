// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Application directory name used for both config scopes
/// (`~/.config/liftoff/` and `./.liftoff/`).
pub const APP_NAME: &str = "liftoff";

/// Resolved configuration scope directories for one invocation.
///
/// Environment variables are read exactly once, when [`Paths::resolve`] is
/// called; the result is passed around as a plain value afterwards.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Global scope: `$XDG_CONFIG_HOME/liftoff/` or `$HOME/.config/liftoff/`.
    pub global: PathBuf,
    /// Local scope: `<workdir>/.liftoff/`.
    pub local: PathBuf,
    /// The working directory the local scope is anchored to.
    pub workdir: PathBuf,
}

impl Paths {
    /// Resolve both scopes against the given working directory.
    pub fn resolve(workdir: &Path) -> Self {
        Self::resolve_with(
            workdir,
            std::env::var_os("XDG_CONFIG_HOME"),
            dirs::home_dir(),
        )
    }

    /// Deterministic variant used by `resolve` and by tests.
    pub fn resolve_with(
        workdir: &Path,
        xdg_config_home: Option<OsString>,
        home: Option<PathBuf>,
    ) -> Self {
        let base = xdg_config_home
            .map(PathBuf::from)
            .filter(|p| p.is_absolute())
            .or_else(|| home.map(|h| h.join(".config")))
            .unwrap_or_else(|| PathBuf::from(".config"));

        Self {
            global: base.join(APP_NAME),
            local: workdir.join(format!(".{APP_NAME}")),
            workdir: workdir.to_path_buf(),
        }
    }

    /// Scope directories in unification order: global first, local second
    /// (the later scope takes precedence).
    pub fn scopes(&self) -> [&Path; 2] {
        [&self.global, &self.local]
    }

    /// Persistent temp directory for resolved artefacts, under the local scope.
    pub fn temp_dir(&self) -> PathBuf {
        self.local.join("temp")
    }

    /// True when at least one scope directory exists on disk.
    pub fn any_scope_exists(&self) -> bool {
        self.global.is_dir() || self.local.is_dir()
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
