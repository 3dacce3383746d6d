//! Signal system for query cache events
//!
//! This crate provides synchronous event fan-out for query cache
//! lifecycle events in the defi-queries ecosystem.

pub mod errors;
pub mod event;
pub mod manager;
pub mod prelude;
pub mod types;

pub use errors::SignalError;
pub use event::{CacheEvent, EventType};
pub use manager::SignalManager;
pub use types::{CallbackId, EventCallback};

// Re-export centralized config
pub use config::SignalConfig;
