// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
mod cli;

use std::path::Path;

use anyhow::{bail, Context};
use clap::Parser;
use tracing::warn;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use cli::{stdin_is_terminal, Cli, Commands};
use liftoff_compose::{ComposeOptions, Composer, ContextRequest, TempManager};
use liftoff_config::{Agent, Config, Loaded, Paths};
use liftoff_exec::{
    handoff, resolve_model, validate_command, write_dry_run, CommandTemplate, CommandVars,
    DryRunMeta,
};
use liftoff_registry::{RegistryClient, DEFAULT_REGISTRY};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let workdir = match &cli.workdir {
        Some(dir) => dir
            .canonicalize()
            .with_context(|| format!("resolving workdir {}", dir.display()))?,
        None => std::env::current_dir().context("reading the current directory")?,
    };
    let paths = Paths::resolve(&workdir);

    match &cli.command {
        Some(Commands::Setup) => return run_setup(&paths).await.map(|_| ()),
        Some(Commands::Install {
            category,
            name,
            local,
        }) => return run_install(&paths, category, name, *local).await,
        Some(Commands::ShowConfig) => {
            let loaded = liftoff_config::load(&paths)?;
            print!("{}", serde_yaml::to_string(&loaded.config)?);
            return Ok(());
        }
        _ => {}
    }

    let mut loaded = liftoff_config::load(&paths)?;
    if loaded.is_empty() {
        run_setup(&paths).await?;
        loaded = liftoff_config::load(&paths)?;
        if loaded.is_empty() {
            bail!("setup completed but no configuration was written");
        }
    }

    launch(&cli, &loaded, &workdir).await
}

async fn launch(cli: &Cli, loaded: &Loaded, workdir: &Path) -> anyhow::Result<()> {
    let config = &loaded.config;

    let (task, instructions) = match &cli.command {
        Some(Commands::Task { name, instructions }) => {
            (Some(name.as_str()), instructions.join(" "))
        }
        _ => (None, String::new()),
    };

    let cache_root = RegistryClient::new()?.cache_root().to_path_buf();
    let composer = Composer::new(config, workdir, cache_root);
    let custom_text = cli.custom_text();
    let composition = composer
        .compose(&ComposeOptions {
            contexts: ContextRequest {
                include_required: !cli.no_required,
                include_defaults: !cli.no_defaults,
                tags: cli.context_selectors(),
            },
            role: cli.role.as_deref(),
            custom_text: custom_text.as_deref(),
            task,
            instructions: &instructions,
        })
        .await?;
    for warning in &composition.warnings {
        warn!("{warning}");
    }

    let (agent_name, agent) = select_agent(config, cli.agent.as_deref())?;
    let template = CommandTemplate::parse(&agent.command)
        .with_context(|| format!("agent \"{agent_name}\" command template"))?;

    let model = resolve_model(agent, cli.model.as_deref()).unwrap_or_default();
    let bin = if agent.bin.is_empty() {
        agent_name.to_string()
    } else {
        agent.bin.clone()
    };
    let vars = CommandVars {
        bin,
        model: model.clone(),
        role: composition.role.clone(),
        role_file: composition
            .role_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default(),
        prompt: composition.prompt.clone(),
        date: chrono::Local::now().format("%Y-%m-%d").to_string(),
    };
    let command = template.render(&vars);
    validate_command(&command, template.as_str())?;

    if cli.dry_run {
        let dir = TempManager::dry_run_dir()?;
        let contexts: Vec<(&str, String)> = composition
            .contexts
            .iter()
            .map(|c| (c.name.as_str(), c.status.to_string()))
            .collect();
        write_dry_run(
            &dir,
            &DryRunMeta {
                agent: agent_name,
                model: &model,
                role_name: &composition.role_name,
                contexts: contexts
                    .iter()
                    .map(|(n, s)| (*n, s.as_str()))
                    .collect(),
                role_text: &composition.role,
                prompt: &composition.prompt,
                command: &command,
            },
        )?;
        println!("{}", dir.display());
        return Ok(());
    }

    handoff(&command, Some(workdir))
}

/// Agent to launch: the flag, else settings.default_agent, else the only
/// configured agent.
fn select_agent<'a>(config: &'a Config, flag: Option<&str>) -> anyhow::Result<(&'a str, &'a Agent)> {
    if let Some(name) = flag.or(config.settings.default_agent.as_deref()) {
        let (key, agent) = config
            .agents
            .get_key_value(name)
            .with_context(|| format!("agent \"{name}\" is not configured"))?;
        return Ok((key.as_str(), agent));
    }
    let mut agents = config.agents.iter();
    match (agents.next(), agents.next()) {
        (Some((name, agent)), None) => Ok((name.as_str(), agent)),
        (None, _) => bail!("no agents configured — run `liftoff setup`"),
        _ => {
            let names = config
                .agents
                .keys()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(", ");
            bail!("multiple agents configured ({names}); pass --agent or set settings.default_agent");
        }
    }
}

async fn run_setup(paths: &Paths) -> anyhow::Result<String> {
    // settings.registry is honoured when a config already exists (explicit
    // `liftoff setup` on a configured machine).
    let registry = liftoff_config::load(paths)
        .ok()
        .and_then(|l| l.config.settings.registry)
        .unwrap_or_else(|| DEFAULT_REGISTRY.to_string());
    let client = RegistryClient::new()?;
    let outcome =
        liftoff_setup::auto_setup(&client, &registry, &paths.global, stdin_is_terminal()).await?;
    for warning in &outcome.warnings {
        warn!("{warning}");
    }
    println!(
        "configured agent \"{}\" in {}",
        outcome.agent_name,
        paths.global.display()
    );
    Ok(outcome.agent_name)
}

async fn run_install(
    paths: &Paths,
    category: &str,
    name: &str,
    local: bool,
) -> anyhow::Result<()> {
    let registry = liftoff_config::load(paths)
        .ok()
        .and_then(|l| l.config.settings.registry)
        .unwrap_or_else(|| DEFAULT_REGISTRY.to_string());
    let scope_dir = if local { &paths.local } else { &paths.global };
    let client = RegistryClient::new()?;
    let file = liftoff_setup::install_asset(&client, &registry, category, name, scope_dir).await?;
    println!("installed {category}/{name} into {}", file.display());
    Ok(())
}

fn init_logging(verbose: u8, quiet: bool) {
    let default = match (quiet, verbose) {
        (true, _) => "error",
        (_, 0) => "warn",
        (_, 1) => "liftoff=debug,info",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_env("LIFTOFF_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}
