// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "liftoff",
    about = "A context-composing launcher for AI agent CLIs",
    version,
    long_about = None,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Free text appended to the composed prompt
    #[arg(value_name = "TEXT")]
    pub text: Vec<String>,

    /// Agent to launch (defaults to settings.default_agent)
    #[arg(long, short = 'a')]
    pub agent: Option<String>,

    /// Role override: a configured role name or a ./path to a role file
    #[arg(long, short = 'r')]
    pub role: Option<String>,

    /// Model override, resolved through the agent's model alias map
    #[arg(long, short = 'm', env = "LIFTOFF_MODEL")]
    pub model: Option<String>,

    /// Context selector: a name, a tag, or a ./path.
    /// May be repeated or comma-separated: -c git -c style,./notes.md
    #[arg(long = "context", short = 'c', value_name = "SELECTOR")]
    pub contexts: Vec<String>,

    /// Leave out contexts marked `default: true`
    #[arg(long)]
    pub no_defaults: bool,

    /// Leave out contexts marked `required: true`
    #[arg(long)]
    pub no_required: bool,

    /// Working directory (local scope and temp files anchor here)
    #[arg(long, short = 'w')]
    pub workdir: Option<PathBuf>,

    /// Compose everything and write preview artefacts instead of launching
    #[arg(long)]
    pub dry_run: bool,

    /// Only report errors
    #[arg(long, short = 'q')]
    pub quiet: bool,

    /// Increase verbosity (-v = debug, -vv = trace)
    #[arg(long, short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Launch a configured task, optionally with instructions.
    ///
    /// NAME may be an exact task name, a unique substring of one, or a
    /// ./path to a prompt file.
    Task {
        name: String,
        /// Instructions substituted as {{.instructions}} in the task
        instructions: Vec<String>,
    },

    /// Install an asset (agents/roles/tasks/contexts) from the registry
    Install {
        /// Asset category: agents, roles, tasks, or contexts
        category: String,
        /// Asset name in the registry index
        name: String,
        /// Install into ./.liftoff/ instead of the global scope
        #[arg(long)]
        local: bool,
    },

    /// Run the first-run setup flow (fetch index, detect agents, write config)
    Setup,

    /// Print the unified configuration and exit
    ShowConfig,
}

impl Cli {
    /// Context selectors with comma-splitting applied, in the order given.
    pub fn context_selectors(&self) -> Vec<String> {
        self.contexts
            .iter()
            .flat_map(|v| v.split(','))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    }

    /// Free text joined into the custom prompt fragment.
    pub fn custom_text(&self) -> Option<String> {
        if self.text.is_empty() {
            None
        } else {
            Some(self.text.join(" "))
        }
    }
}

/// TTY detection for the auto-setup menu.
pub fn stdin_is_terminal() -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::io::AsRawFd;
        unsafe { libc::isatty(std::io::stdin().as_raw_fd()) != 0 }
    }
    #[cfg(not(unix))]
    {
        false
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
