// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! The composer: turn loaded configuration plus a selection request into a
//! prompt, a role, and the artefacts the executor needs.
//!
//! Failure policy is per entity kind: a broken context degrades to a
//! `status: error` entry and is dropped from the prompt; a broken task or
//! explicitly requested role fails the whole operation.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use liftoff_config::{classify, expand_path, Config, RefKind, Utd};
use liftoff_template::{FsLoader, UtdProcessor};
use tracing::warn;

use crate::module_path::resolve_module_file;
use crate::role::{resolve_role, RoleResolution};
use crate::selection::{select_contexts, ContextRequest, Pick};
use crate::task::{find_task, TaskRef};
use crate::temp::TempManager;

/// Resolution state of one entity, reported for UIs and dry-run output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Loaded,
    Skipped,
    Error,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Loaded => write!(f, "loaded"),
            Self::Skipped => write!(f, "skipped"),
            Self::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ContextResolution {
    pub name: String,
    pub status: Status,
    /// The path the context's `{{.file}}` was bound to, when it had one.
    pub file: Option<PathBuf>,
    pub error: Option<String>,
}

/// Everything a launch needs after composition.
#[derive(Debug, Default)]
pub struct Composition {
    pub prompt: String,
    pub contexts: Vec<ContextResolution>,
    pub role: String,
    pub role_file: Option<PathBuf>,
    pub role_name: String,
    pub role_resolutions: Vec<RoleResolution>,
    pub task: Option<String>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ComposeOptions<'a> {
    pub contexts: ContextRequest,
    /// Explicit role from the flag; name or filesystem path.
    pub role: Option<&'a str>,
    /// Free text appended after the context fragments.
    pub custom_text: Option<&'a str>,
    /// Task query: name, unique substring, or path.
    pub task: Option<&'a str>,
    /// Instructions handed to the task's UTD.
    pub instructions: &'a str,
}

/// Shared resolution context threaded through the role/context/task paths.
pub(crate) struct Ctx<'a> {
    pub config: &'a Config,
    pub workdir: &'a Path,
    pub cache_root: &'a Path,
    pub temp: &'a TempManager,
}

pub struct Composer<'a> {
    config: &'a Config,
    workdir: PathBuf,
    cache_root: PathBuf,
    temp: TempManager,
}

impl<'a> Composer<'a> {
    pub fn new(config: &'a Config, workdir: &Path, cache_root: PathBuf) -> Self {
        Self {
            config,
            workdir: workdir.to_path_buf(),
            cache_root,
            temp: TempManager::new(workdir),
        }
    }

    pub async fn compose(&self, opts: &ComposeOptions<'_>) -> anyhow::Result<Composition> {
        let loader = FsLoader {
            workdir: self.workdir.clone(),
        };
        let mut processor = UtdProcessor::new(&loader);
        if let Some(t) = self
            .config
            .settings
            .default_timeout
            .as_deref()
            .and_then(|t| humantime::parse_duration(t).ok())
        {
            processor = processor.with_default_timeout(t);
        }

        let ctx = Ctx {
            config: self.config,
            workdir: &self.workdir,
            cache_root: &self.cache_root,
            temp: &self.temp,
        };

        let mut warnings = Vec::new();
        if let Some(w) = self.temp.gitignore_warning() {
            warnings.push(w);
        }

        // Task first: it is fatal on any failure and may carry the role.
        let mut task_fragment = None;
        let mut task_role = None;
        let mut task_name = None;
        if let Some(query) = opts.task {
            let (fragment, role, name) =
                self.resolve_task(&ctx, &processor, query, opts.instructions, &mut warnings)
                    .await?;
            task_fragment = Some(fragment);
            task_role = role;
            task_name = Some(name);
        }

        // Contexts: per-context failure is non-fatal.
        let selection = select_contexts(self.config, &opts.contexts);
        warnings.extend(selection.warnings);
        let mut contexts = Vec::new();
        let mut fragments = Vec::new();
        for pick in &selection.picks {
            match pick {
                Pick::Named { name, def } => {
                    self.resolve_context(
                        &ctx,
                        &processor,
                        name,
                        def,
                        &mut contexts,
                        &mut fragments,
                        &mut warnings,
                    )
                    .await;
                }
                Pick::File { spec } => {
                    let path = expand_path(spec, &self.workdir);
                    match tokio::fs::read_to_string(&path).await {
                        Ok(text) => {
                            fragments.push(trim_fragment(&text));
                            contexts.push(ContextResolution {
                                name: spec.clone(),
                                status: Status::Loaded,
                                file: Some(path),
                                error: None,
                            });
                        }
                        Err(e) => {
                            let message = format!("context {}: {e}", path.display());
                            warn!("{message}");
                            warnings.push(message.clone());
                            contexts.push(ContextResolution {
                                name: spec.clone(),
                                status: Status::Error,
                                file: Some(path),
                                error: Some(message),
                            });
                        }
                    }
                }
            }
        }
        for name in selection.skipped_defaults {
            contexts.push(ContextResolution {
                name: name.to_string(),
                status: Status::Skipped,
                file: None,
                error: None,
            });
        }

        // Role: flag, else the task's role, else settings.default_role —
        // all explicit and fatal. Only then the optional-fallback walk.
        let explicit = opts
            .role
            .or(task_role.as_deref())
            .or(self.config.settings.default_role.as_deref());
        let role = resolve_role(&ctx, &processor, explicit).await?;
        warnings.extend(role.warnings);

        let mut parts = fragments;
        if let Some(fragment) = task_fragment {
            parts.push(trim_fragment(&fragment));
        }
        if let Some(text) = opts.custom_text.filter(|t| !t.trim().is_empty()) {
            parts.push(trim_fragment(text));
        }

        Ok(Composition {
            prompt: parts.join("\n\n"),
            contexts,
            role: role.text,
            role_file: role.file,
            role_name: role.name,
            role_resolutions: role.resolutions,
            task: task_name,
            warnings,
        })
    }

    async fn resolve_task(
        &self,
        ctx: &Ctx<'_>,
        processor: &UtdProcessor<'_>,
        query: &str,
        instructions: &str,
        warnings: &mut Vec<String>,
    ) -> anyhow::Result<(String, Option<String>, String)> {
        match find_task(self.config, query, &self.workdir)? {
            TaskRef::Named { name, task } => {
                let (resolved, module_warnings) =
                    resolve_source_path(ctx, &task.utd, task.origin.as_deref());
                warnings.extend(module_warnings);
                let staged = match resolved {
                    Some(p) if self.temp.needs_staging(&p) => {
                        Some(self.temp.stage_file("task", name, &p).with_context(|| {
                            format!("staging task \"{name}\"")
                        })?)
                    }
                    other => other,
                };
                let rendered = processor
                    .resolve(&task.utd, staged.as_deref(), instructions)
                    .await
                    .with_context(|| format!("resolving task \"{name}\""))?;
                warnings.extend(rendered.warnings);
                Ok((rendered.text, task.role.clone(), name.to_string()))
            }
            TaskRef::File(path) => {
                let text = tokio::fs::read_to_string(&path)
                    .await
                    .with_context(|| format!("reading task file {}", path.display()))?;
                let utd = Utd {
                    prompt: Some(text),
                    ..Utd::default()
                };
                let rendered = processor
                    .resolve(&utd, Some(path.as_path()), instructions)
                    .await?;
                warnings.extend(rendered.warnings);
                Ok((rendered.text, None, path.display().to_string()))
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn resolve_context(
        &self,
        ctx: &Ctx<'_>,
        processor: &UtdProcessor<'_>,
        name: &str,
        def: &liftoff_config::ContextDef,
        contexts: &mut Vec<ContextResolution>,
        fragments: &mut Vec<String>,
        warnings: &mut Vec<String>,
    ) {
        let (resolved, module_warnings) = resolve_source_path(ctx, &def.utd, def.origin.as_deref());
        warnings.extend(module_warnings);

        let staged = match resolved {
            Some(p) if self.temp.needs_staging(&p) => match self.temp.stage_file("context", name, &p)
            {
                Ok(s) => Some(s),
                Err(e) => {
                    let message = format!("context \"{name}\": {e:#}");
                    warn!("{message}");
                    warnings.push(message.clone());
                    contexts.push(ContextResolution {
                        name: name.to_string(),
                        status: Status::Error,
                        file: Some(p),
                        error: Some(message),
                    });
                    return;
                }
            },
            other => other,
        };

        match processor.resolve(&def.utd, staged.as_deref(), "").await {
            Ok(rendered) => {
                warnings.extend(rendered.warnings);
                fragments.push(trim_fragment(&rendered.text));
                contexts.push(ContextResolution {
                    name: name.to_string(),
                    status: Status::Loaded,
                    file: staged,
                    error: None,
                });
            }
            Err(e) => {
                let message = format!("context \"{name}\": {e:#}");
                warn!("{message}");
                warnings.push(message.clone());
                contexts.push(ContextResolution {
                    name: name.to_string(),
                    status: Status::Error,
                    file: staged,
                    error: Some(message),
                });
            }
        }
    }
}

/// Resolve a UTD `file` string to a concrete path: filesystem paths expand,
/// bare names anchor to the workdir, `@module/` rewrites into the origin's
/// cache extraction. Module misses degrade to a warning, leaving the
/// original string for a later, more contextual error.
pub(crate) fn resolve_source_path(
    ctx: &Ctx<'_>,
    utd: &Utd,
    origin: Option<&str>,
) -> (Option<PathBuf>, Vec<String>) {
    let Some(file) = utd.file.as_deref().filter(|f| !f.trim().is_empty()) else {
        return (None, Vec::new());
    };
    match classify(file) {
        RefKind::Module(sub) => match origin {
            Some(origin) => match resolve_module_file(ctx.cache_root, origin, sub) {
                Ok(path) => (Some(path), Vec::new()),
                Err(warning) => (Some(PathBuf::from(file)), vec![warning]),
            },
            None => (
                Some(PathBuf::from(file)),
                vec![format!("{file}: asset has no origin, cannot resolve @module/ path")],
            ),
        },
        RefKind::Path(p) => (Some(expand_path(p, ctx.workdir)), Vec::new()),
        RefKind::Name(n) => (Some(ctx.workdir.join(n)), Vec::new()),
    }
}

fn trim_fragment(s: &str) -> String {
    s.trim_end_matches('\n').to_string()
}
