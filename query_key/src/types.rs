//! Query key definitions
//!
//! This module provides the identifier values that make up a cache key
//! and the ordered key type itself.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single primitive identifier inside a query key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum KeyPart {
    Text(String),
    Int(i64),
    UInt(u64),
    Bool(bool),
    Null, // Missing identifier, disables the default activation predicate
}

impl KeyPart {
    pub fn is_null(&self) -> bool {
        matches!(self, KeyPart::Null)
    }
}

impl fmt::Display for KeyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPart::Text(s) => write!(f, "{}", s),
            KeyPart::Int(i) => write!(f, "{}", i),
            KeyPart::UInt(u) => write!(f, "{}", u),
            KeyPart::Bool(b) => write!(f, "{}", b),
            KeyPart::Null => write!(f, "_"),
        }
    }
}

/// Convert basic Rust types to KeyPart
impl From<String> for KeyPart {
    fn from(val: String) -> Self {
        KeyPart::Text(val)
    }
}

impl From<&str> for KeyPart {
    fn from(val: &str) -> Self {
        KeyPart::Text(val.to_string())
    }
}

impl From<&String> for KeyPart {
    fn from(val: &String) -> Self {
        KeyPart::Text(val.clone())
    }
}

impl From<i32> for KeyPart {
    fn from(val: i32) -> Self {
        KeyPart::Int(val as i64)
    }
}

impl From<i64> for KeyPart {
    fn from(val: i64) -> Self {
        KeyPart::Int(val)
    }
}

impl From<u32> for KeyPart {
    fn from(val: u32) -> Self {
        KeyPart::UInt(val as u64)
    }
}

impl From<u64> for KeyPart {
    fn from(val: u64) -> Self {
        KeyPart::UInt(val)
    }
}

impl From<bool> for KeyPart {
    fn from(val: bool) -> Self {
        KeyPart::Bool(val)
    }
}

impl<T> From<Option<T>> for KeyPart
where
    T: Into<KeyPart>,
{
    fn from(val: Option<T>) -> Self {
        match val {
            Some(v) => v.into(),
            None => KeyPart::Null,
        }
    }
}

/// Ordered identifier tuple used as a cache key.
///
/// The first part is the scope (for example `"claims"`), the rest are the
/// identifiers the fetched data depends on. Keys compare structurally and
/// order matters: `("a", "b")` and `("b", "a")` are different keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QueryKey {
    parts: Vec<KeyPart>,
}

impl QueryKey {
    pub fn new(scope: &str) -> Self {
        Self {
            parts: vec![KeyPart::Text(scope.to_string())],
        }
    }

    /// Build a key from raw parts, without a scope
    pub fn from_parts(parts: Vec<KeyPart>) -> Self {
        Self { parts }
    }

    pub fn with(mut self, part: impl Into<KeyPart>) -> Self {
        self.push(part);
        self
    }

    pub fn push(&mut self, part: impl Into<KeyPart>) {
        self.parts.push(part.into());
    }

    pub fn parts(&self) -> &[KeyPart] {
        &self.parts
    }

    /// Scope name, if the first part is text
    pub fn scope(&self) -> Option<&str> {
        match self.parts.first() {
            Some(KeyPart::Text(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// True when no identifier is missing
    pub fn is_complete(&self) -> bool {
        !self.parts.iter().any(KeyPart::is_null)
    }

    /// Prefix match on parts, used for scoped invalidation
    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.parts.starts_with(&prefix.parts)
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                write!(f, ":")?;
            }
            write!(f, "{}", part)?;
        }
        Ok(())
    }
}

impl From<&str> for QueryKey {
    fn from(scope: &str) -> Self {
        QueryKey::new(scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_key_display() {
        let key = QueryKey::new("proposal").with("0xabc").with(42u64);
        assert_eq!(key.to_string(), "proposal:0xabc:42");

        let missing = QueryKey::new("claims").with(None::<String>);
        assert_eq!(missing.to_string(), "claims:_");
    }

    #[test]
    fn test_order_matters() {
        let a = QueryKey::new("pair").with("a").with("b");
        let b = QueryKey::new("pair").with("b").with("a");
        assert_ne!(a, b);

        let mut set = HashSet::new();
        set.insert(a.clone());
        set.insert(b);
        set.insert(a);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_is_complete() {
        assert!(QueryKey::new("proposals").is_complete());
        assert!(QueryKey::new("claims").with(Some("0xabc")).is_complete());
        assert!(!QueryKey::new("claims").with(None::<&str>).is_complete());
        assert!(!QueryKey::new("proposal")
            .with(Some("0xabc"))
            .with(None::<u64>)
            .is_complete());
    }

    #[test]
    fn test_starts_with() {
        let key = QueryKey::new("proposal").with("0xabc").with(7u64);
        assert!(key.starts_with(&QueryKey::new("proposal")));
        assert!(key.starts_with(&QueryKey::new("proposal").with("0xabc")));
        assert!(!key.starts_with(&QueryKey::new("proposals")));
        assert!(!key.starts_with(&QueryKey::new("proposal").with("0xdef")));
    }

    #[test]
    fn test_scope() {
        assert_eq!(QueryKey::new("claims").scope(), Some("claims"));
        assert_eq!(QueryKey::from_parts(vec![KeyPart::UInt(1)]).scope(), None);
    }

    #[test]
    fn test_numeric_parts_are_distinct() {
        // Signed and unsigned identifiers never collide
        assert_ne!(KeyPart::from(1i64), KeyPart::from(1u64));
        assert_eq!(KeyPart::from(1i32), KeyPart::from(1i64));
    }
}
