// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Dry-run artefacts.
//!
//! Instead of the handoff, `role.md`, `prompt.md`, and `command.txt` are
//! written into a scratch directory for the caller to preview. The command
//! file carries a metadata header; its last line is the exact command the
//! real run would exec.

use std::path::Path;

use anyhow::Context;

/// Everything the preview files need.
#[derive(Debug, Default)]
pub struct DryRunMeta<'a> {
    pub agent: &'a str,
    pub model: &'a str,
    pub role_name: &'a str,
    /// `(name, status)` pairs in resolution order.
    pub contexts: Vec<(&'a str, &'a str)>,
    pub role_text: &'a str,
    pub prompt: &'a str,
    pub command: &'a str,
}

/// Write the three preview files into `dir` (created by the temp manager).
pub fn write_dry_run(dir: &Path, meta: &DryRunMeta<'_>) -> anyhow::Result<()> {
    std::fs::write(dir.join("role.md"), ensure_trailing_newline(meta.role_text))
        .with_context(|| format!("writing {}", dir.join("role.md").display()))?;
    std::fs::write(dir.join("prompt.md"), ensure_trailing_newline(meta.prompt))
        .with_context(|| format!("writing {}", dir.join("prompt.md").display()))?;

    let contexts = meta
        .contexts
        .iter()
        .map(|(name, status)| format!("{name} ({status})"))
        .collect::<Vec<_>>()
        .join(", ");
    let command_txt = format!(
        "# agent: {}\n# model: {}\n# role: {}\n# contexts: {}\n{}\n",
        meta.agent, meta.model, meta.role_name, contexts, meta.command
    );
    std::fs::write(dir.join("command.txt"), command_txt)
        .with_context(|| format!("writing {}", dir.join("command.txt").display()))?;
    Ok(())
}

fn ensure_trailing_newline(s: &str) -> String {
    if s.is_empty() || s.ends_with('\n') {
        s.to_string()
    } else {
        format!("{s}\n")
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_three_files() {
        let tmp = tempfile::tempdir().unwrap();
        let meta = DryRunMeta {
            agent: "claude",
            model: "claude-sonnet-4-5",
            role_name: "dev",
            contexts: vec![("env", "loaded"), ("project", "loaded")],
            role_text: "You are a developer.",
            prompt: "fragment one\n\nfragment two",
            command: "'claude' -p 'fragment one'",
        };
        write_dry_run(tmp.path(), &meta).unwrap();

        let role = std::fs::read_to_string(tmp.path().join("role.md")).unwrap();
        assert_eq!(role, "You are a developer.\n");
        let prompt = std::fs::read_to_string(tmp.path().join("prompt.md")).unwrap();
        assert!(prompt.contains("fragment one\n\nfragment two"));

        let cmd = std::fs::read_to_string(tmp.path().join("command.txt")).unwrap();
        assert!(cmd.starts_with("# agent: claude\n"));
        assert!(cmd.contains("# contexts: env (loaded), project (loaded)\n"));
        assert_eq!(cmd.lines().last().unwrap(), "'claude' -p 'fragment one'");
    }

    #[test]
    fn empty_role_stays_empty() {
        let tmp = tempfile::tempdir().unwrap();
        write_dry_run(tmp.path(), &DryRunMeta::default()).unwrap();
        let role = std::fs::read_to_string(tmp.path().join("role.md")).unwrap();
        assert_eq!(role, "");
    }
}
