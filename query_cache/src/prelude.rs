//! Convenience re-exports for common query-cache usage

// Core query cache components
pub use crate::errors::{FetchError, QueryError};
pub use crate::manager::QueryCache;
pub use crate::observer::Observer;
pub use crate::params::QueryOptions;
pub use crate::state::{QueryState, QueryStatus};

// Re-export centralized config
pub use config::{AppConfig, QueryConfig};

// Keys and signals used alongside the cache
pub use query_key::{KeyPart, QueryKey};
pub use query_signals::{CacheEvent, EventType, SignalManager};

// Common external dependencies
pub use anyhow;
pub use tokio;
