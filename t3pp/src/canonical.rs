// Copyright 2021 Contributors to the T3PP project.
// SPDX-License-Identifier: MIT

//! Deterministic JSON serialization for manifest signing.
//!
//! The canonical form has object members sorted by the byte-wise order of their keys at every level of
//! nesting, array elements in their original order, and no whitespace between tokens. Strings and numbers
//! are written with the `serde_json` encoder, and both the signer and the verifier go through this module,
//! so the two sides always hash identical bytes regardless of the order in which fields were declared or
//! parsed.

use serde::Serialize;
use serde_json::Value;

/// Serializes the given value tree to canonical JSON bytes.
pub fn canonicalize(value: &Value) -> serde_json::Result<Vec<u8>> {
    let mut out = Vec::new();
    write_canonical(value, &mut out)?;
    Ok(out)
}

/// Converts any serializable value to a JSON value tree and returns its canonical bytes.
pub fn canonicalize_serializable<T: Serialize>(value: &T) -> serde_json::Result<Vec<u8>> {
    let tree = serde_json::to_value(value)?;
    canonicalize(&tree)
}

fn write_canonical(value: &Value, out: &mut Vec<u8>) -> serde_json::Result<()> {
    match value {
        Value::Object(map) => {
            let mut members: Vec<(&String, &Value)> = map.iter().collect();
            members.sort_unstable_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));

            out.push(b'{');
            for (i, (key, member)) in members.into_iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                serde_json::to_writer(&mut *out, key)?;
                out.push(b':');
                write_canonical(member, out)?;
            }
            out.push(b'}');
        }
        Value::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_canonical(item, out)?;
            }
            out.push(b']');
        }
        scalar => serde_json::to_writer(&mut *out, scalar)?,
    }
    Ok(())
}
