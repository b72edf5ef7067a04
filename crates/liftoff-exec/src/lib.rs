// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
mod dryrun;
mod escape;
mod launch;
mod model;
mod template;
mod validate;

pub use dryrun::{write_dry_run, DryRunMeta};
pub use escape::shell_quote;
pub use launch::handoff;
pub use model::resolve_model;
pub use template::{CommandTemplate, CommandVars, TemplateError};
pub use validate::{find_executable, validate_command, CommandError};
