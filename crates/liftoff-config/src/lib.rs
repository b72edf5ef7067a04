// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
mod diagnostics;
mod loader;
mod paths;
mod schema;
mod value;

pub use diagnostics::{ConfigError, Diagnostic};
pub use loader::{load, Loaded};
pub use paths::{Paths, APP_NAME};
pub use schema::*;
pub use value::unify;
