//! Error types for the defi-queries crate
//!
//! This module contains all error types that can be returned by defi-queries operations.

use crate::services::ServiceError;
use config::ConfigError;
use query_cache::QueryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DefiQueriesError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Query cache error: {0}")]
    Query(#[from] QueryError),

    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    #[error("Invalid address: {0:?}")]
    InvalidAddress(String),

    #[error("Invalid asset symbol: {0:?}")]
    InvalidAsset(String),
}
