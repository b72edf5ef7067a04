// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
mod client;
mod index;
mod module;
mod version;

pub use client::RegistryClient;
pub use index::{Index, IndexEntry};
pub use module::{extract_dir, module_base_name, split_version};
pub use version::{parse_selector, pick_latest};

/// Registry consulted when `settings.registry` is unset.
pub const DEFAULT_REGISTRY: &str = "reg.liftoff.dev/liftoff/assets";

/// Well-known catalogue module under a registry base.
pub const INDEX_MODULE: &str = "index";
