//! # defi-queries
//!
//! Keyed, de-duplicated async data fetching for a DeFi frontend: wallet
//! claims, liquidation queues and governance proposals, each bound to a
//! cache key built from the identifiers it depends on.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use defi_queries::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn run(service: Arc<dyn DefiService>) -> Result<(), DefiQueriesError> {
//! let queries = DefiQueries::new(&AppConfig::default(), service)?;
//! queries.cache().start_gc()?;
//!
//! // Idle until a wallet is connected
//! let mut claims = queries.claims();
//! assert!(claims.state().is_idle());
//!
//! let address = queries.connect("0xABC")?;
//! claims.set_identifiers(Some(address));
//!
//! let state = claims.settled().await;
//! match (state.data(), state.error()) {
//!     (Some(claims), _) => println!("{} claimable items", claims.items.len()),
//!     (None, Some(error)) => println!("could not load claims: {error}"),
//!     _ => {}
//! }
//!
//! queries.shutdown();
//! # Ok(())
//! # }
//! ```

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

pub mod core;
pub mod errors;
pub mod hooks;
pub mod prelude;
pub mod services;
pub mod session;

// Re-export the main public types for convenience
pub use core::DefiQueries;
pub use errors::DefiQueriesError;
pub use hooks::QueryHook;

// Re-export centralized config
pub use config::{AppConfig, QueryConfig, SignalConfig};

// Re-export internal crates used in the public API
pub use query_cache;
pub use query_key;
pub use query_signals;

// Re-export external dependencies used in public API
pub use async_trait;
