//! Convenience re-exports for common query-signals usage

// Core signal system components
pub use crate::errors::SignalError;
pub use crate::event::{CacheEvent, EventType};
pub use crate::manager::SignalManager;
pub use crate::types::{CallbackId, EventCallback};

// Re-export centralized config
pub use config::SignalConfig;

// Common external dependencies
pub use serde::{Deserialize, Serialize};
pub use serde_json;
