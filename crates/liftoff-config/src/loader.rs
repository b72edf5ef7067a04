// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Scope-aware configuration loading.
//!
//! Each scope directory contributes its `*.yaml`/`*.yml` files in filename
//! order; files unify within a scope, then the local scope unifies over the
//! global one. Per-file typed parses run first so that type violations are
//! reported against the offending file with line/column precision, before
//! the merged tree is deserialised.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::diagnostics::{ConfigError, Diagnostic};
use crate::paths::Paths;
use crate::schema::{validate, Config};
use crate::value::unify;

/// The result of loading both scopes.
///
/// `is_empty()` is the auto-setup sentinel: no recognised config files were
/// found in either scope. This is distinct from a parse error, which is
/// returned as `Err`.
#[derive(Debug, Default)]
pub struct Loaded {
    pub config: Config,
    /// Files that contributed, in unification order.
    pub files: Vec<PathBuf>,
    provenance: HashMap<String, PathBuf>,
}

impl Loaded {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// The file that last defined `key` (e.g. `"contexts.env"`), falling
    /// back to the key's parent map, then the first loaded file.
    pub fn origin_of(&self, key: &str) -> Option<&Path> {
        if let Some(p) = self.provenance.get(key) {
            return Some(p);
        }
        if let Some((parent, _)) = key.rsplit_once('.') {
            if let Some(p) = self.provenance.get(parent) {
                return Some(p);
            }
        }
        self.files.first().map(PathBuf::as_path)
    }
}

/// Load and unify the configuration from both scope directories.
pub fn load(paths: &Paths) -> Result<Loaded, ConfigError> {
    let mut merged = serde_yaml::Value::Mapping(serde_yaml::Mapping::new());
    let mut files = Vec::new();
    let mut provenance = HashMap::new();

    for scope in paths.scopes() {
        for file in list_config_files(scope) {
            debug!(path = %file.display(), "loading config layer");
            let text = std::fs::read_to_string(&file).map_err(|source| ConfigError::Io {
                path: file.clone(),
                source,
            })?;

            let layer: serde_yaml::Value = serde_yaml::from_str(&text)
                .map_err(|e| ConfigError::Parse(Diagnostic::from_yaml(&file, &text, &e)))?;

            // Typed parse of the single file: catches type violations with
            // the file's own line/column before unification hides them.
            let typed: Config = serde_yaml::from_str(&text)
                .map_err(|e| ConfigError::Invalid(Diagnostic::from_yaml(&file, &text, &e)))?;
            record_provenance(&typed, &file, &mut provenance);

            unify(&mut merged, layer);
            files.push(file);
        }
    }

    if files.is_empty() {
        return Ok(Loaded::default());
    }

    let config: Config = serde_yaml::from_value(merged).map_err(|e| {
        // Only reachable when unification produced a shape no single file
        // had; attribute to the local scope since it won the merge.
        ConfigError::Invalid(Diagnostic::validation(
            &paths.local,
            format!("unified configuration is invalid: {e}"),
        ))
    })?;

    let loaded = Loaded {
        config,
        files,
        provenance,
    };

    if let Some((key, message)) = validate(&loaded.config).into_iter().next() {
        let file = loaded
            .origin_of(&key)
            .unwrap_or(paths.local.as_path())
            .to_path_buf();
        return Err(ConfigError::Invalid(Diagnostic::validation(
            &file,
            format!("{key}: {message}"),
        )));
    }

    Ok(loaded)
}

/// Recognised declarative files in a scope directory, in filename order.
fn list_config_files(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| {
            p.is_file()
                && matches!(
                    p.extension().and_then(|e| e.to_str()),
                    Some("yaml") | Some("yml")
                )
        })
        .collect();
    files.sort();
    files
}

fn record_provenance(config: &Config, file: &Path, provenance: &mut HashMap<String, PathBuf>) {
    for name in config.agents.keys() {
        provenance.insert(format!("agents.{name}"), file.to_path_buf());
    }
    for name in config.roles.keys() {
        provenance.insert(format!("roles.{name}"), file.to_path_buf());
    }
    for name in config.contexts.keys() {
        provenance.insert(format!("contexts.{name}"), file.to_path_buf());
    }
    for name in config.tasks.keys() {
        provenance.insert(format!("tasks.{name}"), file.to_path_buf());
    }
    let s = &config.settings;
    if s.default_agent.is_some()
        || s.default_role.is_some()
        || s.registry.is_some()
        || s.default_timeout.is_some()
    {
        provenance.insert("settings".into(), file.to_path_buf());
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
