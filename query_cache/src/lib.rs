//! Query cache for keyed async data fetching
//!
//! This crate provides the process-wide cache that backs query hooks:
//! de-duplicated invocations per key, stale-response protection,
//! invalidation and idle-entry collection.

/// Conditional debug logging macros
/// These macros only compile in code when the `debug-logging` feature is enabled
#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {
        tracing::trace!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {};
}

pub mod errors;
pub mod manager;
pub mod observer;
pub mod params;
pub mod prelude;
pub mod state;

// Re-export centralized config
pub use config::QueryConfig;

pub use errors::{FetchError, QueryError};
pub use manager::QueryCache;
pub use observer::Observer;
pub use params::QueryOptions;
pub use state::{QueryState, QueryStatus};
