// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Process handoff.
//!
//! The launcher's job ends by becoming the agent: the current process image
//! is replaced with `shell -c <command>`, inheriting the environment and
//! stdio. Temp artefacts written during composition stay valid afterwards
//! because nothing of the launcher survives to clean them up.

use std::path::Path;
use std::process::Command;

use anyhow::Context;
use tracing::info;

use crate::validate::find_executable;

/// Prefer bash for its saner `-c` semantics; any POSIX sh will do.
fn locate_shell() -> anyhow::Result<std::path::PathBuf> {
    find_executable("bash")
        .or_else(|| find_executable("sh"))
        .context("neither bash nor sh found on PATH")
}

/// Replace the current process with the agent command.
///
/// On unix this only returns on failure (`exec` does not return on
/// success). On other platforms it degrades to spawn-and-wait and exits
/// with the child's status.
pub fn handoff(command: &str, workdir: Option<&Path>) -> anyhow::Result<()> {
    let shell = locate_shell()?;
    if let Some(dir) = workdir {
        std::env::set_current_dir(dir)
            .with_context(|| format!("changing directory to {}", dir.display()))?;
    }
    info!(shell = %shell.display(), cmd = %command, "handing off");

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        let err = Command::new(&shell).arg("-c").arg(command).exec();
        Err(err).with_context(|| format!("exec {} -c {command:?}", shell.display()))
    }

    #[cfg(not(unix))]
    {
        let status = Command::new(&shell)
            .arg("-c")
            .arg(command)
            .status()
            .with_context(|| format!("running {} -c {command:?}", shell.display()))?;
        std::process::exit(status.code().unwrap_or(1));
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locates_a_shell() {
        let shell = locate_shell().unwrap();
        let name = shell.file_name().unwrap().to_string_lossy();
        assert!(name == "bash" || name == "sh");
    }

    // handoff() itself replaces the test process and is exercised by the
    // dry-run path plus manual runs instead.
}
