// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! The UTD processor: resolve a `{file, command, prompt}` triple plus
//! caller-supplied instructions into rendered text.
//!
//! The template source is chosen in priority order prompt → file → command.
//! `{{.file_contents}}` and `{{.command_output}}` are materialised only when
//! the source references them; the I/O sits behind [`SourceLoader`] so the
//! laziness contract is provable with a recorder double.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::bail;
use async_trait::async_trait;

use liftoff_config::Utd;

use crate::placeholder::{references, render};
use crate::shell::{run_command, CommandOutput};

/// Applied when neither the UTD nor settings specify a command timeout.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// I/O seam between the processor and the filesystem/subprocess layer.
#[async_trait]
pub trait SourceLoader: Send + Sync {
    async fn read_file(&self, path: &Path) -> std::io::Result<String>;
    async fn run_command(
        &self,
        command: &str,
        shell: Option<&str>,
        timeout: Duration,
    ) -> anyhow::Result<CommandOutput>;
}

/// Production loader: real files, real subprocesses, run from `workdir`.
pub struct FsLoader {
    pub workdir: PathBuf,
}

#[async_trait]
impl SourceLoader for FsLoader {
    async fn read_file(&self, path: &Path) -> std::io::Result<String> {
        tokio::fs::read_to_string(path).await
    }

    async fn run_command(
        &self,
        command: &str,
        shell: Option<&str>,
        timeout: Duration,
    ) -> anyhow::Result<CommandOutput> {
        run_command(command, shell, timeout, &self.workdir).await
    }
}

/// Rendered UTD output plus any non-fatal warnings collected on the way.
#[derive(Debug, Default)]
pub struct Rendered {
    pub text: String,
    pub warnings: Vec<String>,
}

pub struct UtdProcessor<'a> {
    loader: &'a dyn SourceLoader,
    /// Timeout applied when the UTD has none (settings-level default).
    pub default_timeout: Duration,
}

impl<'a> UtdProcessor<'a> {
    pub fn new(loader: &'a dyn SourceLoader) -> Self {
        Self {
            loader,
            default_timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Resolve a UTD to text. `file_path` is the already-resolved location
    /// of `utd.file` (the composer rebinds it to a temp copy when needed);
    /// it is what `{{.file}}` renders to.
    pub async fn resolve(
        &self,
        utd: &Utd,
        file_path: Option<&Path>,
        instructions: &str,
    ) -> anyhow::Result<Rendered> {
        let mut warnings = Vec::new();
        let timeout = utd.timeout_duration().unwrap_or(self.default_timeout);

        // Pick the template source: prompt, else file contents, else
        // command output.
        let has = |s: &Option<String>| s.as_deref().is_some_and(|v| !v.trim().is_empty());
        let mut file_contents: Option<String> = None;
        let mut command_output: Option<String> = None;

        let source = if has(&utd.prompt) {
            utd.prompt.clone().unwrap_or_default()
        } else if has(&utd.file) {
            let Some(path) = file_path else {
                bail!(
                    "no resolved path for file \"{}\"",
                    utd.file.as_deref().unwrap_or_default()
                );
            };
            let text = self.loader.read_file(path).await?;
            file_contents = Some(text.clone());
            text
        } else if has(&utd.command) {
            let (out, warning) = self.capture_command(utd, timeout).await;
            if let Some(w) = warning {
                warnings.push(w);
            }
            command_output = Some(out.clone());
            out
        } else {
            bail!("UTD requires at least one of file/command/prompt");
        };

        let mut vars: HashMap<String, String> = HashMap::new();
        vars.insert(
            "file".into(),
            file_path
                .map(|p| p.display().to_string())
                .or_else(|| utd.file.clone())
                .unwrap_or_default(),
        );
        vars.insert("command".into(), utd.command.clone().unwrap_or_default());
        vars.insert(
            "date".into(),
            chrono::Local::now().format("%Y-%m-%d").to_string(),
        );
        vars.insert("instructions".into(), instructions.to_string());

        // Lazily materialise the expensive slots, reusing what the source
        // selection already produced.
        if references(&source, "file_contents") {
            let contents = match file_contents {
                Some(c) => c,
                None => match file_path {
                    Some(path) => match self.loader.read_file(path).await {
                        Ok(c) => c,
                        Err(e) => {
                            warnings.push(format!("reading {}: {e}", path.display()));
                            String::new()
                        }
                    },
                    None => String::new(),
                },
            };
            vars.insert("file_contents".into(), contents);
        }
        if references(&source, "command_output") {
            let output = match command_output {
                Some(o) => o,
                None if has(&utd.command) => {
                    let (out, warning) = self.capture_command(utd, timeout).await;
                    if let Some(w) = warning {
                        warnings.push(w);
                    }
                    out
                }
                None => String::new(),
            };
            vars.insert("command_output".into(), output);
        }

        Ok(Rendered {
            text: render(&source, &vars),
            warnings,
        })
    }

    /// Run the UTD's command; failures become warnings and empty output.
    async fn capture_command(&self, utd: &Utd, timeout: Duration) -> (String, Option<String>) {
        let command = utd.command.as_deref().unwrap_or_default();
        match self
            .loader
            .run_command(command, utd.shell.as_deref(), timeout)
            .await
        {
            Ok(out) if out.timed_out => (
                out.stdout,
                Some(format!("command {command:?} timed out after {timeout:?}")),
            ),
            Ok(out) if !out.success() => {
                let code = out.status.map_or("?".to_string(), |c| c.to_string());
                (
                    out.stdout,
                    Some(format!("command {command:?} exited {code}: {}", out.stderr.trim())),
                )
            }
            Ok(out) => (out.stdout, None),
            Err(e) => (String::new(), Some(format!("command {command:?} failed: {e}"))),
        }
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
