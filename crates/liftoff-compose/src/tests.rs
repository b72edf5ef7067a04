// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Composition pipeline tests over fixture config trees.

use std::path::PathBuf;

use liftoff_config::Config;

use crate::composer::{ComposeOptions, Composer, Status};
use crate::selection::ContextRequest;

struct Fixture {
    _tmp: tempfile::TempDir,
    workdir: PathBuf,
    cache_root: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let workdir = tmp.path().join("work");
        let cache_root = tmp.path().join("cache");
        std::fs::create_dir_all(&workdir).unwrap();
        std::fs::create_dir_all(&cache_root).unwrap();
        Self {
            _tmp: tmp,
            workdir,
            cache_root,
        }
    }

    fn write(&self, rel: &str, text: &str) -> PathBuf {
        let path = self.workdir.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, text).unwrap();
        path
    }

    fn write_outside(&self, rel: &str, text: &str) -> PathBuf {
        let path = self._tmp.path().join("elsewhere").join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, text).unwrap();
        path
    }

    fn composer<'a>(&self, config: &'a Config) -> Composer<'a> {
        Composer::new(config, &self.workdir, self.cache_root.clone())
    }
}

fn cfg(yaml: &str) -> Config {
    serde_yaml::from_str(yaml).unwrap()
}

fn all_contexts() -> ContextRequest {
    ContextRequest {
        include_required: true,
        include_defaults: true,
        tags: vec![],
    }
}

#[tokio::test]
async fn required_contexts_compose_in_order_with_blank_line() {
    let fx = Fixture::new();
    let config = cfg(
        "\
contexts:
  env:
    prompt: 'env fragment'
    required: true
  project:
    prompt: 'project fragment'
    required: true
",
    );
    let composition = fx
        .composer(&config)
        .compose(&ComposeOptions {
            contexts: all_contexts(),
            ..ComposeOptions::default()
        })
        .await
        .unwrap();
    assert_eq!(composition.prompt, "env fragment\n\nproject fragment");
    assert_eq!(composition.contexts.len(), 2);
    assert!(composition
        .contexts
        .iter()
        .all(|c| c.status == Status::Loaded));
}

#[tokio::test]
async fn composition_is_deterministic() {
    let fx = Fixture::new();
    let config = cfg(
        "\
contexts:
  a: {prompt: alpha, required: true}
  b: {prompt: beta, default: true}
",
    );
    let composer = fx.composer(&config);
    let opts = ComposeOptions {
        contexts: all_contexts(),
        ..ComposeOptions::default()
    };
    let first = composer.compose(&opts).await.unwrap();
    let second = composer.compose(&opts).await.unwrap();
    assert_eq!(first.prompt, second.prompt);
    assert_eq!(
        first.contexts.iter().map(|c| &c.name).collect::<Vec<_>>(),
        second.contexts.iter().map(|c| &c.name).collect::<Vec<_>>()
    );
}

#[tokio::test]
async fn missing_context_file_is_nonfatal_error_entry() {
    let fx = Fixture::new();
    let config = cfg(
        "\
contexts:
  broken:
    file: ./missing.md
    required: true
  ok:
    prompt: 'still here'
    required: true
",
    );
    let composition = fx
        .composer(&config)
        .compose(&ComposeOptions {
            contexts: all_contexts(),
            ..ComposeOptions::default()
        })
        .await
        .unwrap();
    assert_eq!(composition.prompt, "still here");
    let broken = &composition.contexts[0];
    assert_eq!(broken.name, "broken");
    assert_eq!(broken.status, Status::Error);
    assert!(broken.error.is_some());
    assert!(!composition.warnings.is_empty());
}

#[tokio::test]
async fn optional_role_chain_falls_through_to_inline() {
    let fx = Fixture::new();
    let config = cfg(
        "\
roles:
  alpha:
    file: /nonexistent/alpha.md
    optional: true
  beta:
    prompt: 'You are beta'
",
    );
    let composition = fx
        .composer(&config)
        .compose(&ComposeOptions::default())
        .await
        .unwrap();
    assert_eq!(composition.role_name, "beta");
    assert_eq!(composition.role, "You are beta");
    let statuses: Vec<(String, Status)> = composition
        .role_resolutions
        .iter()
        .map(|r| (r.name.clone(), r.status))
        .collect();
    assert_eq!(
        statuses,
        vec![
            ("alpha".to_string(), Status::Skipped),
            ("beta".to_string(), Status::Loaded)
        ]
    );
    // Inline role gets a readable temp file for {{.role_file}}.
    let file = composition.role_file.unwrap();
    assert!(file.is_file());
    assert_eq!(std::fs::read_to_string(file).unwrap(), "You are beta");
}

#[tokio::test]
async fn required_role_with_missing_file_fails_hard() {
    let fx = Fixture::new();
    let config = cfg(
        "\
roles:
  alpha:
    file: /nonexistent/alpha.md
  beta:
    prompt: 'You are beta'
",
    );
    let err = fx
        .composer(&config)
        .compose(&ComposeOptions::default())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("alpha"));
}

#[tokio::test]
async fn all_roles_skipped_is_actionable_error() {
    let fx = Fixture::new();
    let config = cfg(
        "\
roles:
  a: {file: /nope/a.md, optional: true}
  b: {file: /nope/b.md, optional: true}
",
    );
    let err = fx
        .composer(&config)
        .compose(&ComposeOptions::default())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("no roles available"));
}

#[tokio::test]
async fn no_roles_configured_composes_with_empty_role() {
    let fx = Fixture::new();
    let config = cfg("contexts:\n  c: {prompt: x, required: true}\n");
    let composition = fx
        .composer(&config)
        .compose(&ComposeOptions {
            contexts: all_contexts(),
            ..ComposeOptions::default()
        })
        .await
        .unwrap();
    assert_eq!(composition.role, "");
    assert!(composition.role_file.is_none());
}

#[tokio::test]
async fn explicit_role_path_reads_the_file() {
    let fx = Fixture::new();
    let role_file = fx.write("roles/dev.md", "You are a developer.\n");
    let config = cfg("roles:\n  other: {prompt: nope}\n");
    let spec = format!("./{}", role_file.strip_prefix(&fx.workdir).unwrap().display());
    let composition = fx
        .composer(&config)
        .compose(&ComposeOptions {
            role: Some(&spec),
            ..ComposeOptions::default()
        })
        .await
        .unwrap();
    assert_eq!(composition.role, "You are a developer.\n");
    assert_eq!(composition.role_name, spec);
    assert!(composition.role_file.unwrap().is_file());
}

#[tokio::test]
async fn explicit_missing_role_name_is_fatal() {
    let fx = Fixture::new();
    let config = cfg("roles:\n  dev: {prompt: hi}\n");
    let err = fx
        .composer(&config)
        .compose(&ComposeOptions {
            role: Some("ghost"),
            ..ComposeOptions::default()
        })
        .await
        .unwrap_err();
    assert!(err.to_string().contains("ghost"));
}

#[tokio::test]
async fn default_role_setting_behaves_like_explicit_flag() {
    let fx = Fixture::new();
    // default_role names a role whose file is missing: fatal, never a
    // fallback walk.
    let config = cfg(
        "\
roles:
  primary:
    file: /nonexistent/primary.md
    optional: true
  backup:
    prompt: 'backup role'
settings:
  default_role: primary
",
    );
    let err = fx
        .composer(&config)
        .compose(&ComposeOptions::default())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("primary"));
}

#[tokio::test]
async fn task_renders_command_output_and_instructions() {
    let fx = Fixture::new();
    let config = cfg(
        "\
tasks:
  review:
    command: \"printf 'CMD-OUT'\"
    prompt: \"Output: {{.command_output}}\\nFocus: {{.instructions}}\"
",
    );
    let composition = fx
        .composer(&config)
        .compose(&ComposeOptions {
            task: Some("review"),
            instructions: "focus on error handling",
            ..ComposeOptions::default()
        })
        .await
        .unwrap();
    assert!(composition.prompt.contains("Output: CMD-OUT"));
    assert!(composition.prompt.contains("Focus: focus on error handling"));
    assert_eq!(composition.task.as_deref(), Some("review"));
}

#[tokio::test]
async fn ambiguous_task_prefix_lists_matches() {
    let fx = Fixture::new();
    let config = cfg(
        "\
tasks:
  golang/code-review: {prompt: a}
  golang/refactor: {prompt: b}
",
    );
    let err = fx
        .composer(&config)
        .compose(&ComposeOptions {
            task: Some("golang"),
            ..ComposeOptions::default()
        })
        .await
        .unwrap_err();
    let message = err.to_string();
    assert!(message.contains("golang/code-review"));
    assert!(message.contains("golang/refactor"));
}

#[tokio::test]
async fn missing_task_is_fatal() {
    let fx = Fixture::new();
    let config = cfg("tasks:\n  docs: {prompt: d}\n");
    let err = fx
        .composer(&config)
        .compose(&ComposeOptions {
            task: Some("nothing"),
            ..ComposeOptions::default()
        })
        .await
        .unwrap_err();
    assert!(err.to_string().contains("nothing"));
}

#[tokio::test]
async fn task_role_reference_selects_that_role() {
    let fx = Fixture::new();
    let config = cfg(
        "\
roles:
  fallback: {prompt: 'fallback role'}
  reviewer: {prompt: 'You review code'}
tasks:
  review:
    prompt: 'do a review'
    role: reviewer
",
    );
    let composition = fx
        .composer(&config)
        .compose(&ComposeOptions {
            task: Some("review"),
            ..ComposeOptions::default()
        })
        .await
        .unwrap();
    assert_eq!(composition.role_name, "reviewer");
    assert_eq!(composition.role, "You review code");
}

#[tokio::test]
async fn role_flag_beats_task_role() {
    let fx = Fixture::new();
    let config = cfg(
        "\
roles:
  reviewer: {prompt: reviewer}
  pirate: {prompt: pirate}
tasks:
  review: {prompt: p, role: reviewer}
",
    );
    let composition = fx
        .composer(&config)
        .compose(&ComposeOptions {
            task: Some("review"),
            role: Some("pirate"),
            ..ComposeOptions::default()
        })
        .await
        .unwrap();
    assert_eq!(composition.role_name, "pirate");
}

#[tokio::test]
async fn out_of_workdir_context_is_staged_and_file_rebound() {
    let fx = Fixture::new();
    let outside = fx.write_outside("cached/notes.md", "outside body");
    let config_yaml = format!(
        "\
contexts:
  notes:
    file: {}
    prompt: 'from {{{{.file}}}}: {{{{.file_contents}}}}'
    required: true
",
        outside.display()
    );
    let config = cfg(&config_yaml);
    let composition = fx
        .composer(&config)
        .compose(&ComposeOptions {
            contexts: all_contexts(),
            ..ComposeOptions::default()
        })
        .await
        .unwrap();

    let staged = composition.contexts[0].file.clone().unwrap();
    assert!(staged.starts_with(fx.workdir.join(".liftoff/temp")));
    assert!(staged.ends_with("context-notes.md"));
    assert!(composition
        .prompt
        .contains(&format!("from {}", staged.display())));
    assert!(composition.prompt.contains("outside body"));
}

#[tokio::test]
async fn in_workdir_context_is_used_in_place() {
    let fx = Fixture::new();
    fx.write("PROJECT.md", "project body");
    let config = cfg(
        "\
contexts:
  project:
    file: ./PROJECT.md
    required: true
",
    );
    let composition = fx
        .composer(&config)
        .compose(&ComposeOptions {
            contexts: all_contexts(),
            ..ComposeOptions::default()
        })
        .await
        .unwrap();
    let file = composition.contexts[0].file.clone().unwrap();
    assert!(!file.starts_with(fx.workdir.join(".liftoff/temp")));
    assert_eq!(composition.prompt, "project body");
}

#[tokio::test]
async fn skipped_defaults_reported_but_not_in_prompt() {
    let fx = Fixture::new();
    let config = cfg(
        "\
contexts:
  wanted: {prompt: wanted, tags: [x]}
  quiet: {prompt: 'quiet body', default: true}
",
    );
    let composition = fx
        .composer(&config)
        .compose(&ComposeOptions {
            contexts: ContextRequest {
                include_required: true,
                include_defaults: true,
                tags: vec!["x".into()],
            },
            ..ComposeOptions::default()
        })
        .await
        .unwrap();
    assert!(!composition.prompt.contains("quiet body"));
    let quiet = composition
        .contexts
        .iter()
        .find(|c| c.name == "quiet")
        .unwrap();
    assert_eq!(quiet.status, Status::Skipped);
}

#[tokio::test]
async fn custom_text_lands_after_contexts() {
    let fx = Fixture::new();
    let config = cfg("contexts:\n  c: {prompt: 'ctx', required: true}\n");
    let composition = fx
        .composer(&config)
        .compose(&ComposeOptions {
            contexts: all_contexts(),
            custom_text: Some("free text"),
            ..ComposeOptions::default()
        })
        .await
        .unwrap();
    assert_eq!(composition.prompt, "ctx\n\nfree text");
}

#[tokio::test]
async fn module_file_resolves_via_origin_cache() {
    let fx = Fixture::new();
    let module_dir = fx
        .cache_root
        .join("mod/extract/host/org/tasks/review/review@v0.1.0");
    std::fs::create_dir_all(&module_dir).unwrap();
    std::fs::write(module_dir.join("prompt.md"), "module prompt body").unwrap();

    let config = cfg(
        "\
tasks:
  review:
    file: '@module/prompt.md'
    origin: host/org/tasks/review@v0.1.0
",
    );
    let composition = fx
        .composer(&config)
        .compose(&ComposeOptions {
            task: Some("review"),
            ..ComposeOptions::default()
        })
        .await
        .unwrap();
    assert!(composition.prompt.contains("module prompt body"));
}

#[tokio::test]
async fn unknown_tag_warns_but_composes() {
    let fx = Fixture::new();
    let config = cfg("contexts:\n  c: {prompt: body, required: true}\n");
    let composition = fx
        .composer(&config)
        .compose(&ComposeOptions {
            contexts: ContextRequest {
                include_required: true,
                include_defaults: true,
                tags: vec!["made-up".into()],
            },
            ..ComposeOptions::default()
        })
        .await
        .unwrap();
    assert_eq!(composition.prompt, "body");
    assert!(composition
        .warnings
        .iter()
        .any(|w| w.contains("made-up")));
}
