//! Query keys built from ordered identifier tuples
//! This crate provides the structurally-compared key type shared across the query ecosystem

pub mod serialize;
pub mod types;

// Re-export commonly used items
pub use serialize::key_part_from_json;
pub use types::{KeyPart, QueryKey};
