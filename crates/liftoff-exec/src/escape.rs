// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! POSIX single-quote escaping.
//!
//! Everything between single quotes is literal to the shell; the only
//! character that needs care is the single quote itself, rendered as
//! `'"'"'` (close quote, double-quoted quote, reopen).

/// Quote `s` so the shell passes it through byte-for-byte.
pub fn shell_quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for ch in s.chars() {
        if ch == '\'' {
            out.push_str(r#"'"'"'"#);
        } else {
            out.push(ch);
        }
    }
    out.push('\'');
    out
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command;

    #[test]
    fn plain_string_is_wrapped() {
        assert_eq!(shell_quote("hello"), "'hello'");
    }

    #[test]
    fn embedded_single_quote() {
        assert_eq!(shell_quote("don't"), r#"'don'"'"'t'"#);
    }

    /// The round-trip law: for any S, `sh -c "printf '%s' <quoted>"` prints
    /// exactly S.
    fn round_trips(s: &str) {
        let quoted = shell_quote(s);
        let out = Command::new("sh")
            .arg("-c")
            .arg(format!("printf '%s' {quoted}"))
            .output()
            .expect("sh available");
        assert_eq!(String::from_utf8_lossy(&out.stdout), s, "input: {s:?}");
    }

    #[test]
    fn round_trip_shell_metacharacters() {
        round_trips("plain");
        round_trips("$HOME and ${PATH}");
        round_trips("$(rm -rf /) `whoami`");
        round_trips("a'b''c");
        round_trips(r#"back\slash and "double" quotes"#);
        round_trips("semi;colon && pipe | redirect > x < y");
        round_trips("multi\nline\ttabbed");
        round_trips("*glob? [set] {brace}");
    }

    #[test]
    fn round_trip_empty_string() {
        round_trips("");
    }
}
