//! Cache event types and definitions
//!
//! This module defines the structure of query cache events
//! that flow through the signal system.

use query_key::QueryKey;
use serde::{Deserialize, Serialize};

/// Cache event type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    FetchStarted,
    FetchSucceeded,
    FetchFailed,
    FetchRetried,
    StaleDiscarded,
    Invalidated,
    Evicted,
    Removed,
}

/// Query cache event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEvent {
    /// Event type
    pub event_type: EventType,
    /// Key of the affected entry
    pub key: QueryKey,
    /// Invocation generation the event belongs to (0 when not fetch related)
    pub generation: u64,
    /// Error text for failures, attempt info for retries
    pub message: Option<String>,
    /// Event timestamp (UTC)
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl CacheEvent {
    pub fn new(event_type: EventType, key: QueryKey) -> Self {
        Self {
            event_type,
            key,
            generation: 0,
            message: None,
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn with_generation(mut self, generation: u64) -> Self {
        self.generation = generation;
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Render the event as JSON, for log sinks that ship structured records
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
