//! util/canonical_json.rs
//! Deterministic JSON rendering used for `context_hash` (spec §3.1, §8
//! invariant 1: "deterministic and stable under JSON key permutation").

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Render a `Value` with object keys sorted recursively, independent of
/// insertion order. `serde_json::Value`'s `Map` preserves insertion order
/// even without the `preserve_order` feature disabled, so we always
/// re-sort explicitly rather than relying on feature flags.
pub fn canonicalize(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::String(s) => {
            out.push('"');
            for c in s.chars() {
                match c {
                    '"' => out.push_str("\\\""),
                    '\\' => out.push_str("\\\\"),
                    '\n' => out.push_str("\\n"),
                    '\r' => out.push_str("\\r"),
                    '\t' => out.push_str("\\t"),
                    c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
                    c => out.push(c),
                }
            }
            out.push('"');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(&Value::String((*key).clone()), out);
                out.push(':');
                write_canonical(&map[*key], out);
            }
            out.push('}');
        }
    }
}

/// `SHA-256(text ‖ canonical_json(context))`, hex-encoded (spec §3.1).
pub fn context_hash(text: &str, context: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hasher.update(canonicalize(context).as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn hash_is_stable_under_key_permutation() {
        let a = json!({"a": 1, "b": 2, "c": {"x": 1, "y": 2}});
        let b = json!({"c": {"y": 2, "x": 1}, "b": 2, "a": 1});
        assert_eq!(context_hash("hello", &a), context_hash("hello", &b));
    }

    #[test]
    fn hash_changes_with_text() {
        let ctx = json!({});
        assert_ne!(context_hash("a", &ctx), context_hash("b", &ctx));
    }

    #[test]
    fn hash_is_deterministic() {
        let ctx = json!({"k": [1, 2, 3]});
        assert_eq!(context_hash("t", &ctx), context_hash("t", &ctx));
    }
}
