//! Error types for query cache operations
//!
//! `QueryError` covers misuse of the cache itself. `FetchError` carries the
//! failure of a fetch function and is stored in entries as data, so callers
//! branch on it instead of unwinding.

use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Query cache errors
#[derive(Error, Debug, Clone)]
pub enum QueryError {
    #[error("Type mismatch for key {key}: expected {expected}")]
    TypeMismatch { key: String, expected: &'static str },

    #[error("Key not found: {0}")]
    NotFound(String),

    #[error("Invocation for {0} was cancelled before it settled")]
    Cancelled(String),

    #[error("Fetch failed: {0}")]
    Fetch(FetchError),

    #[error("Query cache is shut down")]
    ShutDown,

    #[error("No Tokio runtime available to run the invocation")]
    NoRuntime,
}

/// Failure of a fetch function, with the original cause preserved
#[derive(Clone)]
pub struct FetchError(Arc<anyhow::Error>);

impl FetchError {
    pub fn new(error: anyhow::Error) -> Self {
        Self(Arc::new(error))
    }

    /// Borrow the underlying cause as a concrete error type
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        self.0.downcast_ref::<E>()
    }

    pub fn root_cause(&self) -> &(dyn std::error::Error + 'static) {
        self.0.root_cause()
    }

    pub fn inner(&self) -> &anyhow::Error {
        &self.0
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#}", self.0)
    }
}

impl fmt::Debug for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl From<anyhow::Error> for FetchError {
    fn from(error: anyhow::Error) -> Self {
        Self::new(error)
    }
}

impl From<QueryError> for FetchError {
    fn from(error: QueryError) -> Self {
        match error {
            QueryError::Fetch(inner) => inner,
            other => Self::new(anyhow::Error::new(other)),
        }
    }
}
