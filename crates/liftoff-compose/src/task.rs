// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Task lookup: exact name, unique substring, or filesystem path.

use std::path::PathBuf;

use liftoff_config::{classify, expand_path, Config, RefKind, Task};

#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("task \"{query}\" is ambiguous, matches: {}", candidates.join(", "))]
    Ambiguous {
        query: String,
        candidates: Vec<String>,
    },
    #[error("task \"{query}\" not found")]
    NotFound { query: String },
}

#[derive(Debug)]
pub enum TaskRef<'a> {
    Named { name: &'a str, task: &'a Task },
    File(PathBuf),
}

/// Resolve a task query against the loaded configuration.
///
/// Substring ambiguity is surfaced as a typed error carrying every match so
/// an interactive caller can offer the choice instead of failing.
pub fn find_task<'a>(
    config: &'a Config,
    query: &str,
    workdir: &std::path::Path,
) -> Result<TaskRef<'a>, TaskError> {
    if let RefKind::Path(path) = classify(query) {
        return Ok(TaskRef::File(expand_path(path, workdir)));
    }

    if let Some((name, task)) = config.tasks.get_key_value(query) {
        return Ok(TaskRef::Named { name, task });
    }

    let matches: Vec<(&String, &Task)> = config
        .tasks
        .iter()
        .filter(|(name, _)| name.contains(query))
        .collect();
    match matches.as_slice() {
        [] => Err(TaskError::NotFound {
            query: query.to_string(),
        }),
        [(name, task)] => Ok(TaskRef::Named { name, task }),
        many => Err(TaskError::Ambiguous {
            query: query.to_string(),
            candidates: many.iter().map(|(n, _)| (*n).clone()).collect(),
        }),
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn config() -> Config {
        serde_yaml::from_str(
            "\
tasks:
  golang/code-review:
    prompt: review
  golang/refactor:
    prompt: refactor
  docs:
    prompt: docs
",
        )
        .unwrap()
    }

    #[test]
    fn exact_name_wins() {
        let cfg = config();
        match find_task(&cfg, "docs", Path::new("/w")).unwrap() {
            TaskRef::Named { name, .. } => assert_eq!(name, "docs"),
            other => panic!("wrong ref: {other:?}"),
        }
    }

    #[test]
    fn unique_substring_matches() {
        let cfg = config();
        match find_task(&cfg, "refactor", Path::new("/w")).unwrap() {
            TaskRef::Named { name, .. } => assert_eq!(name, "golang/refactor"),
            other => panic!("wrong ref: {other:?}"),
        }
    }

    #[test]
    fn ambiguous_substring_lists_all_matches() {
        let cfg = config();
        let err = find_task(&cfg, "golang", Path::new("/w")).unwrap_err();
        match err {
            TaskError::Ambiguous { candidates, .. } => {
                assert_eq!(candidates, vec!["golang/code-review", "golang/refactor"]);
            }
            other => panic!("wrong error: {other:?}"),
        }
    }

    #[test]
    fn missing_task_is_not_found() {
        let cfg = config();
        assert!(matches!(
            find_task(&cfg, "nothing", Path::new("/w")),
            Err(TaskError::NotFound { .. })
        ));
    }

    #[test]
    fn path_query_bypasses_the_map() {
        let cfg = config();
        match find_task(&cfg, "./my-task.md", Path::new("/w")).unwrap() {
            TaskRef::File(p) => assert_eq!(p, PathBuf::from("/w/./my-task.md")),
            other => panic!("wrong ref: {other:?}"),
        }
    }
}
