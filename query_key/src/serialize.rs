//! Serialization utilities
//!
//! This module converts arbitrary serializable identifiers (filter objects,
//! pagination structs) into key parts.

use crate::types::{KeyPart, QueryKey};
use serde::Serialize;

/// Convert a JSON value to a KeyPart.
///
/// Scalars map onto their natural variant. Arrays and objects are rendered as
/// canonical JSON text so structurally equal values produce equal parts.
pub fn key_part_from_json(value: serde_json::Value) -> KeyPart {
    match value {
        serde_json::Value::String(s) => KeyPart::Text(s),
        serde_json::Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                KeyPart::UInt(u)
            } else if let Some(i) = n.as_i64() {
                KeyPart::Int(i)
            } else {
                KeyPart::Text(n.to_string())
            }
        }
        serde_json::Value::Bool(b) => KeyPart::Bool(b),
        serde_json::Value::Null => KeyPart::Null,
        // serde_json's default map is ordered, so object text is canonical
        other => KeyPart::Text(other.to_string()),
    }
}

impl QueryKey {
    /// Append a serializable identifier. Values that fail to serialize
    /// become `Null`, which disables the default activation predicate.
    pub fn with_serialized<T: Serialize>(self, value: &T) -> Self {
        let part = serde_json::to_value(value)
            .map(key_part_from_json)
            .unwrap_or(KeyPart::Null);
        self.with(part)
    }
}
