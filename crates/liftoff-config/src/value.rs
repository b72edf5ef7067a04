// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Order-preserving unification of YAML value trees.
//!
//! `serde_yaml::Mapping` keeps insertion order, which makes it a suitable
//! backing store for the definition-order contract: keys already present in
//! the base keep their position, keys only present in the overlay are
//! appended in the overlay's own order.

/// Deep-merge `overlay` into `base`.
///
/// Mappings merge key-by-key; any other value kind (scalar, sequence) is
/// replaced wholesale by the overlay. The overlay wins on conflicts, so
/// callers unify the global scope first and the local scope second.
pub fn unify(base: &mut serde_yaml::Value, overlay: serde_yaml::Value) {
    match (base, overlay) {
        (serde_yaml::Value::Mapping(b), serde_yaml::Value::Mapping(o)) => {
            for (k, v) in o {
                match b.get_mut(&k) {
                    Some(slot) => unify(slot, v),
                    None => {
                        b.insert(k, v);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn val(s: &str) -> serde_yaml::Value {
        serde_yaml::from_str(s).unwrap()
    }

    #[test]
    fn overlay_scalar_wins() {
        let mut base = val("x: 1");
        unify(&mut base, val("x: 2"));
        assert_eq!(base["x"].as_i64(), Some(2));
    }

    #[test]
    fn base_keys_survive() {
        let mut base = val("a: 1\nb: 2");
        unify(&mut base, val("b: 99"));
        assert_eq!(base["a"].as_i64(), Some(1));
        assert_eq!(base["b"].as_i64(), Some(99));
    }

    #[test]
    fn nested_mappings_merge() {
        let mut base = val("agents:\n  claude:\n    bin: claude\n    default_model: sonnet");
        unify(&mut base, val("agents:\n  claude:\n    default_model: opus"));
        assert_eq!(base["agents"]["claude"]["bin"].as_str(), Some("claude"));
        assert_eq!(
            base["agents"]["claude"]["default_model"].as_str(),
            Some("opus")
        );
    }

    #[test]
    fn sequences_are_replaced_not_appended() {
        let mut base = val("tags: [a, b]");
        unify(&mut base, val("tags: [c]"));
        let tags: Vec<&str> = base["tags"]
            .as_sequence()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        assert_eq!(tags, vec!["c"]);
    }

    #[test]
    fn key_order_is_base_first_then_overlay_appended() {
        let mut base = val("contexts:\n  env: {prompt: a}\n  project: {prompt: b}");
        unify(&mut base, val("contexts:\n  extra: {prompt: c}\n  env: {prompt: z}"));
        let keys: Vec<&str> = base["contexts"]
            .as_mapping()
            .unwrap()
            .iter()
            .map(|(k, _)| k.as_str().unwrap())
            .collect();
        assert_eq!(keys, vec!["env", "project", "extra"]);
        assert_eq!(base["contexts"]["env"]["prompt"].as_str(), Some("z"));
    }
}
