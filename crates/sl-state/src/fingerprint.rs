//! Canonical fingerprint of a state mapping.
//!
//! The fingerprint is the lowercase-hex SHA-256 of the canonical JSON
//! text of the mapping.  Canonical form:
//!
//! - top-level keys in insertion order (the engine's expected ordering;
//!   reordering top-level keys changes the fingerprint),
//! - nested object keys sorted byte-lexicographically,
//! - no insignificant whitespace,
//! - numbers in their shortest round-trip form,
//! - strings minimally escaped, raw UTF-8 otherwise.
//!
//! Equal fingerprints witness structural equality of the mappings, so
//! the text must be byte-stable across hosts and process restarts.

use crate::StateMap;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt::Write as _;

/// Fingerprint of the whole mapping.  The empty mapping fingerprints
/// the two-byte text `{}`.
pub fn state_fingerprint(state: &StateMap) -> String {
    let mut canon = String::with_capacity(2 + state.len() * 16);
    canon.push('{');
    for (i, (key, value)) in state.iter().enumerate() {
        if i > 0 {
            canon.push(',');
        }
        write_string(&mut canon, key);
        canon.push(':');
        write_canonical(&mut canon, value);
    }
    canon.push('}');
    hex::encode(Sha256::digest(canon.as_bytes()))
}

fn write_canonical(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(true) => out.push_str("true"),
        Value::Bool(false) => out.push_str("false"),
        // serde_json renders numbers in shortest round-trip form.
        Value::Number(n) => {
            let _ = write!(out, "{n}");
        }
        Value::String(s) => write_string(out, s),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(out, item);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (key, value)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(out, key);
                out.push(':');
                write_canonical(out, value);
            }
            out.push('}');
        }
    }
}

/// Minimal escaping, byte-identical to serde_json's serializer output.
fn write_string(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0c}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
}
