// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Asset installation.
//!
//! An asset module carries a definition file named after its kind
//! (`role.yaml`, `context.yaml`, `task.yaml`, `agent.yaml`). Installation
//! extracts the concrete field values, stamps the exact versioned module
//! path into `origin`, and merges the result into the category's config
//! file in the chosen scope.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use liftoff_config::{Agent, ContextDef, Role, Task};
use liftoff_registry::RegistryClient;
use tracing::info;

const GENERATED_HEADER: &str = "# Generated by liftoff — edit freely.\n";

/// Fetch `category/name` from the registry and merge it into
/// `<scope_dir>/<category>.yaml`. Returns the file written.
pub async fn install_asset(
    client: &RegistryClient,
    registry: &str,
    category: &str,
    name: &str,
    scope_dir: &Path,
) -> anyhow::Result<PathBuf> {
    let module = format!("{registry}/{category}/{name}@v0");
    let canonical = client
        .resolve_latest(&module)
        .await
        .with_context(|| format!("resolving {module}"))?;
    let dir = client.fetch(&canonical).await?;
    let value = entity_from_module(category, &dir, &canonical)?;
    let file = append_entity(scope_dir, category, name, value)?;
    info!(asset = %format!("{category}/{name}"), module = %canonical, file = %file.display(), "installed asset");
    Ok(file)
}

/// Parse the module's definition file into the category's entity type,
/// dropping anything that is not a concrete field, and stamp the origin.
pub fn entity_from_module(
    category: &str,
    module_dir: &Path,
    canonical: &str,
) -> anyhow::Result<serde_yaml::Value> {
    let kind = category.strip_suffix('s').unwrap_or(category);
    let def_path = module_dir.join(format!("{kind}.yaml"));
    let text = std::fs::read_to_string(&def_path)
        .with_context(|| format!("reading {}", def_path.display()))?;

    let value = match category {
        "roles" => {
            let mut role: Role = serde_yaml::from_str(&text)?;
            role.origin = Some(canonical.to_string());
            serde_yaml::to_value(&role)?
        }
        "contexts" => {
            let mut ctx: ContextDef = serde_yaml::from_str(&text)?;
            ctx.origin = Some(canonical.to_string());
            serde_yaml::to_value(&ctx)?
        }
        "tasks" => {
            let mut task: Task = serde_yaml::from_str(&text)?;
            task.origin = Some(canonical.to_string());
            serde_yaml::to_value(&task)?
        }
        "agents" => {
            let agent: Agent = serde_yaml::from_str(&text)?;
            serde_yaml::to_value(&agent)?
        }
        other => bail!("unknown asset category \"{other}\""),
    };
    Ok(value)
}

/// Merge `name: value` under the `category` key of
/// `<scope_dir>/<category>.yaml`, creating the file when absent.
pub fn append_entity(
    scope_dir: &Path,
    category: &str,
    name: &str,
    value: serde_yaml::Value,
) -> anyhow::Result<PathBuf> {
    let file = scope_dir.join(format!("{category}.yaml"));
    let mut root: serde_yaml::Value = match std::fs::read_to_string(&file) {
        Ok(text) => serde_yaml::from_str(&text)
            .with_context(|| format!("parsing existing {}", file.display()))?,
        Err(_) => serde_yaml::Value::Mapping(serde_yaml::Mapping::new()),
    };

    let serde_yaml::Value::Mapping(map) = &mut root else {
        bail!("{} is not a mapping", file.display());
    };
    let entry = map
        .entry(serde_yaml::Value::String(category.to_string()))
        .or_insert(serde_yaml::Value::Mapping(serde_yaml::Mapping::new()));
    let serde_yaml::Value::Mapping(entities) = entry else {
        bail!("{}: key \"{category}\" is not a mapping", file.display());
    };
    entities.insert(serde_yaml::Value::String(name.to_string()), value);

    std::fs::create_dir_all(scope_dir)
        .with_context(|| format!("creating {}", scope_dir.display()))?;
    let body = serde_yaml::to_string(&root)?;
    std::fs::write(&file, format!("{GENERATED_HEADER}{body}"))
        .with_context(|| format!("writing {}", file.display()))?;
    Ok(file)
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
