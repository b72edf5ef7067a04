// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Shell runner for UTD `command` fields.
//!
//! Commands run under `sh -c` (or the UTD's `shell`) with a timeout. On
//! timeout the child gets SIGTERM, a short grace period, then SIGKILL;
//! whatever output was captured before termination is returned.

use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::Mutex;
use tracing::debug;

/// Grace period between SIGTERM and SIGKILL.
const TERM_GRACE: Duration = Duration::from_secs(2);
/// How long to wait for pipe drain after a kill. Surviving grandchildren can
/// hold the pipe open indefinitely, so the drain must be bounded.
const KILL_DRAIN: Duration = Duration::from_millis(500);

#[derive(Debug, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// Exit code when the process terminated normally.
    pub status: Option<i32>,
    pub timed_out: bool,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        !self.timed_out && self.status == Some(0)
    }
}

/// Run `command` through `shell -c` in `workdir`, bounded by `timeout`.
pub async fn run_command(
    command: &str,
    shell: Option<&str>,
    timeout: Duration,
    workdir: &Path,
) -> anyhow::Result<CommandOutput> {
    let shell = shell.unwrap_or("sh");
    debug!(cmd = %command, shell, timeout = ?timeout, "running UTD command");

    let mut child = tokio::process::Command::new(shell)
        .arg("-c")
        .arg(command)
        .current_dir(workdir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("spawning {shell} -c {command:?}"))?;

    // Readers append into shared buffers incrementally so partial output
    // survives a timeout kill even while the pipes stay open.
    let stdout_buf = Arc::new(Mutex::new(Vec::new()));
    let stderr_buf = Arc::new(Mutex::new(Vec::new()));
    let stdout_task = child
        .stdout
        .take()
        .map(|pipe| tokio::spawn(read_into(pipe, stdout_buf.clone())));
    let stderr_task = child
        .stderr
        .take()
        .map(|pipe| tokio::spawn(read_into(pipe, stderr_buf.clone())));

    let (status, timed_out) = match tokio::time::timeout(timeout, child.wait()).await {
        Ok(waited) => (waited.context("waiting for UTD command")?.code(), false),
        Err(_) => {
            terminate_politely(&mut child).await;
            (None, true)
        }
    };

    // Normal exit closes the pipes promptly; after a kill, grandchildren may
    // keep them open, so cap the drain.
    let drain = async {
        if let Some(t) = stdout_task {
            let _ = t.await;
        }
        if let Some(t) = stderr_task {
            let _ = t.await;
        }
    };
    if timed_out {
        let _ = tokio::time::timeout(KILL_DRAIN, drain).await;
    } else {
        drain.await;
    }

    let stdout = stdout_buf.lock().await.clone();
    let stderr = stderr_buf.lock().await.clone();

    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&stdout).into_owned(),
        stderr: String::from_utf8_lossy(&stderr).into_owned(),
        status,
        timed_out,
    })
}

async fn read_into(mut pipe: impl AsyncRead + Unpin, buf: Arc<Mutex<Vec<u8>>>) {
    let mut chunk = [0u8; 8192];
    loop {
        match pipe.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => buf.lock().await.extend_from_slice(&chunk[..n]),
        }
    }
}

/// SIGTERM, wait out the grace period, then SIGKILL.
async fn terminate_politely(child: &mut tokio::process::Child) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        unsafe {
            libc::kill(pid as libc::pid_t, libc::SIGTERM);
        }
        if tokio::time::timeout(TERM_GRACE, child.wait()).await.is_ok() {
            return;
        }
    }
    let _ = child.kill().await;
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
