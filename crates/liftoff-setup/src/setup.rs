// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! First-run auto-setup.
//!
//! Runs when no configuration exists in either scope: fetch the catalogue,
//! detect installed agent binaries, pick one (silently, or via a menu on a
//! TTY), fetch its module, and materialise `agents.yaml` plus
//! `settings.yaml` in the global scope.

use std::io::Write;
use std::path::Path;

use anyhow::{bail, Context};
use liftoff_config::Agent;
use liftoff_registry::RegistryClient;
use tracing::{info, warn};

use crate::detect::{detect_agents, DetectedAgent};
use crate::install::{append_entity, install_asset};

const GENERATED_HEADER: &str = "# Generated by liftoff setup — edit freely.\n";

/// Default assets installed after the agent, best-effort.
const DEFAULT_CONTEXTS: [&str; 1] = ["workdir"];

#[derive(Debug)]
pub struct SetupOutcome {
    pub agent_name: String,
    pub warnings: Vec<String>,
}

pub async fn auto_setup(
    client: &RegistryClient,
    registry: &str,
    global_dir: &Path,
    interactive: bool,
) -> anyhow::Result<SetupOutcome> {
    let index = client
        .fetch_index(registry)
        .await
        .with_context(|| format!("fetching the asset index from {registry}"))?;

    let detected = detect_agents(&index);
    let chosen = match detected.len() {
        0 => {
            let known = index
                .agents
                .values()
                .filter(|e| !e.bin.is_empty())
                .map(|e| format!("  {} — {}", e.bin, e.description))
                .collect::<Vec<_>>()
                .join("\n");
            bail!("no supported agent binaries found on PATH; install one of:\n{known}");
        }
        1 => &detected[0],
        _ if interactive => prompt_choice(&detected)?,
        _ => {
            let names = detected
                .iter()
                .map(|d| d.entry.bin.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            bail!(
                "multiple agents detected ({names}) but no terminal to choose from; \
                 re-run liftoff interactively"
            );
        }
    };
    info!(agent = %chosen.name, bin = %chosen.entry.bin, "selected agent");

    let canonical = client
        .resolve_latest(&chosen.entry.module)
        .await
        .with_context(|| format!("resolving {}", chosen.entry.module))?;
    let dir = client.fetch(&canonical).await?;
    let def_path = dir.join("agent.yaml");
    let text = std::fs::read_to_string(&def_path)
        .with_context(|| format!("reading {}", def_path.display()))?;
    let agent: Agent = serde_yaml::from_str(&text)
        .with_context(|| format!("parsing {}", def_path.display()))?;

    write_setup_files(global_dir, chosen.name, &agent)?;

    // Default assets are a convenience, never a reason to fail the setup.
    let mut warnings = Vec::new();
    for context in DEFAULT_CONTEXTS {
        if !index.contexts.contains_key(context) {
            continue;
        }
        if let Err(e) = install_asset(client, registry, "contexts", context, global_dir).await {
            let message = format!("installing default context \"{context}\": {e:#}");
            warn!("{message}");
            warnings.push(message);
        }
    }

    Ok(SetupOutcome {
        agent_name: chosen.name.to_string(),
        warnings,
    })
}

/// Materialise the two generated config files in the global scope.
pub fn write_setup_files(global_dir: &Path, name: &str, agent: &Agent) -> anyhow::Result<()> {
    std::fs::create_dir_all(global_dir)
        .with_context(|| format!("creating {}", global_dir.display()))?;

    append_entity(global_dir, "agents", name, serde_yaml::to_value(agent)?)?;

    let mut settings = serde_yaml::Mapping::new();
    settings.insert("default_agent".into(), name.into());
    let mut root = serde_yaml::Mapping::new();
    root.insert("settings".into(), serde_yaml::Value::Mapping(settings));
    let body = serde_yaml::to_string(&serde_yaml::Value::Mapping(root))?;
    let file = global_dir.join("settings.yaml");
    std::fs::write(&file, format!("{GENERATED_HEADER}{body}"))
        .with_context(|| format!("writing {}", file.display()))?;
    Ok(())
}

/// Numbered menu on stdin/stderr; accepts an index or a bin name
/// (case-insensitive).
fn prompt_choice<'a, 'i>(
    detected: &'a [DetectedAgent<'i>],
) -> anyhow::Result<&'a DetectedAgent<'i>> {
    let mut err = std::io::stderr();
    writeln!(err, "Multiple agents detected:")?;
    for (i, d) in detected.iter().enumerate() {
        writeln!(err, "  {}. {} — {}", i + 1, d.entry.bin, d.entry.description)?;
    }
    write!(err, "Select an agent [1-{}]: ", detected.len())?;
    err.flush()?;

    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    parse_choice(&line, detected).context("no matching agent for that answer")
}

/// Pure selection logic, split out for tests.
fn parse_choice<'a, 'i>(
    input: &str,
    detected: &'a [DetectedAgent<'i>],
) -> Option<&'a DetectedAgent<'i>> {
    let answer = input.trim();
    if let Ok(n) = answer.parse::<usize>() {
        if (1..=detected.len()).contains(&n) {
            return Some(&detected[n - 1]);
        }
        return None;
    }
    detected
        .iter()
        .find(|d| d.entry.bin.eq_ignore_ascii_case(answer))
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use liftoff_registry::Index;

    fn detected_pair(index: &Index) -> Vec<DetectedAgent<'_>> {
        // Both bins resolve to `sh` so detection works on any machine.
        detect_agents(index)
    }

    fn index() -> Index {
        serde_yaml::from_str(
            "\
agents:
  shell:
    module: host/x/agents/shell@v0
    bin: sh
    description: a shell
  bash-agent:
    module: host/x/agents/bash@v0
    bin: bash
    description: another shell
",
        )
        .unwrap()
    }

    #[test]
    fn choice_by_number() {
        let idx = index();
        let detected = detected_pair(&idx);
        let picked = parse_choice("2\n", &detected).unwrap();
        assert_eq!(picked.name, "bash-agent");
    }

    #[test]
    fn choice_by_bin_name_case_insensitive() {
        let idx = index();
        let detected = detected_pair(&idx);
        let picked = parse_choice("BASH\n", &detected).unwrap();
        assert_eq!(picked.name, "bash-agent");
    }

    #[test]
    fn out_of_range_number_is_rejected() {
        let idx = index();
        let detected = detected_pair(&idx);
        assert!(parse_choice("0", &detected).is_none());
        assert!(parse_choice("9", &detected).is_none());
    }

    #[test]
    fn unknown_name_is_rejected() {
        let idx = index();
        let detected = detected_pair(&idx);
        assert!(parse_choice("zsh", &detected).is_none());
    }

    #[test]
    fn setup_files_carry_generated_header() {
        let tmp = tempfile::tempdir().unwrap();
        let agent: Agent = serde_yaml::from_str(
            "bin: claude\ncommand: '{{.bin}} {{.prompt}}'\ndefault_model: sonnet\n",
        )
        .unwrap();
        write_setup_files(tmp.path(), "claude", &agent).unwrap();

        let agents = std::fs::read_to_string(tmp.path().join("agents.yaml")).unwrap();
        assert!(agents.starts_with("# Generated by liftoff"));
        let parsed: serde_yaml::Value = serde_yaml::from_str(&agents).unwrap();
        assert_eq!(parsed["agents"]["claude"]["bin"].as_str(), Some("claude"));

        let settings = std::fs::read_to_string(tmp.path().join("settings.yaml")).unwrap();
        assert!(settings.starts_with("# Generated by liftoff"));
        let parsed: serde_yaml::Value = serde_yaml::from_str(&settings).unwrap();
        assert_eq!(
            parsed["settings"]["default_agent"].as_str(),
            Some("claude")
        );
    }
}
