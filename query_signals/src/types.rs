//! Type definitions for signal system

use crate::event::CacheEvent;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Event callback type
pub type EventCallback = Arc<dyn Fn(&CacheEvent) + Send + Sync>;

/// Handle returned by `SignalManager::add_callback`, used for removal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallbackId(pub u64);

impl fmt::Display for CallbackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
