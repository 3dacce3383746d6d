//! Error types for signal operations

use thiserror::Error;

/// Signal system errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignalError {
    #[error("Callback limit reached: {0}")]
    TooManyCallbacks(usize),

    #[error("Callback not found: {0}")]
    CallbackNotFound(u64),
}
