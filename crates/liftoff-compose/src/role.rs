// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Role selection.
//!
//! An explicit role (flag, task reference, or `settings.default_role`) must
//! resolve or the whole launch fails. Without one, the roles map is walked
//! in definition order, skipping optional roles whose files are missing,
//! until one loads. Inline roles get their rendered text written to a temp
//! file so `{{.role_file}}` always names something readable.

use std::path::PathBuf;

use anyhow::{bail, Context};
use liftoff_config::{classify, expand_path, RefKind};
use liftoff_template::UtdProcessor;
use tracing::debug;

use crate::composer::{resolve_source_path, Ctx, Status};

/// One entry of the ordered role-resolution report.
#[derive(Debug, Clone)]
pub struct RoleResolution {
    pub name: String,
    pub status: Status,
    pub file: Option<String>,
    pub optional: bool,
    pub error: Option<String>,
}

#[derive(Debug, Default)]
pub struct RoleOutcome {
    pub name: String,
    pub text: String,
    /// Always set for a successfully selected role.
    pub file: Option<PathBuf>,
    pub resolutions: Vec<RoleResolution>,
    pub warnings: Vec<String>,
}

pub(crate) async fn resolve_role(
    ctx: &Ctx<'_>,
    processor: &UtdProcessor<'_>,
    explicit: Option<&str>,
) -> anyhow::Result<RoleOutcome> {
    match explicit {
        Some(spec) => resolve_explicit(ctx, processor, spec).await,
        None => walk_roles(ctx, processor).await,
    }
}

/// Flag / task / settings role: any failure is fatal — the user asked for
/// this one specifically.
async fn resolve_explicit(
    ctx: &Ctx<'_>,
    processor: &UtdProcessor<'_>,
    spec: &str,
) -> anyhow::Result<RoleOutcome> {
    if let RefKind::Path(path) = classify(spec) {
        let expanded = expand_path(path, ctx.workdir);
        let text = tokio::fs::read_to_string(&expanded)
            .await
            .with_context(|| format!("reading role file {}", expanded.display()))?;
        return Ok(RoleOutcome {
            name: spec.to_string(),
            text,
            file: Some(expanded),
            resolutions: vec![RoleResolution {
                name: spec.to_string(),
                status: Status::Loaded,
                file: Some(spec.to_string()),
                optional: false,
                error: None,
            }],
            warnings: Vec::new(),
        });
    }

    let role = ctx
        .config
        .roles
        .get(spec)
        .with_context(|| format!("role \"{spec}\" is not configured"))?;
    let mut outcome = load_role(ctx, processor, spec, role)
        .await
        .with_context(|| format!("resolving role \"{spec}\""))?;
    outcome.resolutions = vec![RoleResolution {
        name: spec.to_string(),
        status: Status::Loaded,
        file: role.utd.file.clone(),
        optional: role.optional,
        error: None,
    }];
    Ok(outcome)
}

/// Default selection: first role whose file exists (or that has no file).
async fn walk_roles(ctx: &Ctx<'_>, processor: &UtdProcessor<'_>) -> anyhow::Result<RoleOutcome> {
    // A setup without roles is legitimate (fresh auto-setup); the role and
    // role-file slots simply render empty.
    if ctx.config.roles.is_empty() {
        return Ok(RoleOutcome::default());
    }

    let mut resolutions = Vec::new();
    let mut warnings = Vec::new();

    for (name, role) in &ctx.config.roles {
        let has_file = role.utd.file.as_deref().is_some_and(|f| !f.trim().is_empty());
        if has_file {
            let (path, mut module_warnings) =
                resolve_source_path(ctx, &role.utd, role.origin.as_deref());
            warnings.append(&mut module_warnings);
            let path = path.unwrap_or_default();
            if !path.is_file() {
                let message = format!("file not found: {}", path.display());
                if role.optional {
                    debug!(role = %name, "skipping optional role, {message}");
                    resolutions.push(RoleResolution {
                        name: name.clone(),
                        status: Status::Skipped,
                        file: role.utd.file.clone(),
                        optional: true,
                        error: Some(message),
                    });
                    continue;
                }
                resolutions.push(RoleResolution {
                    name: name.clone(),
                    status: Status::Error,
                    file: role.utd.file.clone(),
                    optional: false,
                    error: Some(message.clone()),
                });
                bail!("role \"{name}\": {message}");
            }
        }

        let mut outcome = load_role(ctx, processor, name, role)
            .await
            .with_context(|| format!("resolving role \"{name}\""))?;
        resolutions.push(RoleResolution {
            name: name.clone(),
            status: Status::Loaded,
            file: role.utd.file.clone(),
            optional: role.optional,
            error: None,
        });
        outcome.resolutions = resolutions;
        outcome.warnings.extend(warnings);
        return Ok(outcome);
    }

    bail!("no roles available — all configured roles reference missing files");
}

/// UTD-resolve a role and pin down its file path, staging or writing an
/// inline temp file as needed.
async fn load_role(
    ctx: &Ctx<'_>,
    processor: &UtdProcessor<'_>,
    name: &str,
    role: &liftoff_config::Role,
) -> anyhow::Result<RoleOutcome> {
    let (resolved, mut warnings) = resolve_source_path(ctx, &role.utd, role.origin.as_deref());
    let staged = match resolved {
        Some(path) if ctx.temp.needs_staging(&path) => Some(ctx.temp.stage_file("role", name, &path)?),
        other => other,
    };

    let rendered = processor.resolve(&role.utd, staged.as_deref(), "").await?;
    warnings.extend(rendered.warnings);

    let file = match staged {
        Some(path) => path,
        None => ctx.temp.write_inline("role", name, &rendered.text)?,
    };

    Ok(RoleOutcome {
        name: name.to_string(),
        text: rendered.text,
        file: Some(file),
        resolutions: Vec::new(),
        warnings,
    })
}
