//! Canonical JSON serialization and content checksum for session payloads.
//!
//! The checksum is the dedup key (together with source and type), so it must
//! not depend on object key order or on whitespace in the submitted payload.
//! It is computed from the parsed `serde_json::Value`, never from raw text,
//! and does not rely on the iteration order of `serde_json::Map` (which
//! changes when `preserve_order` is enabled anywhere in the dependency graph).

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Serialize `value` canonically: object keys sorted, no insignificant whitespace.
#[must_use]
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

/// Lowercase hex SHA-256 over [`canonical_json`].
#[must_use]
pub fn checksum(value: &Value) -> String {
    let digest = Sha256::digest(canonical_json(value).as_bytes());
    format!("{digest:x}")
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(key, out);
                out.push(':');
                write_canonical(item, out);
            }
            out.push('}');
        },
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        },
        Value::String(s) => write_string(s, out),
        // Null, Bool and Number render identically under every serde_json configuration.
        scalar => out.push_str(&scalar.to_string()),
    }
}

fn write_string(s: &str, out: &mut String) {
    // Display on Value::String applies JSON escaping.
    out.push_str(&Value::String(s.to_owned()).to_string());
}
