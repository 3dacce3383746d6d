//! Query state exposed to callers
//!
//! Entries store their value type-erased. `QueryState<T>` is the typed,
//! read-only view handed out by observers and hooks.

use crate::errors::FetchError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::sync::Arc;

/// Lifecycle of a key: `Idle -> Loading -> {Success | Error}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueryStatus {
    Idle,
    Loading,
    Success,
    Error,
}

pub(crate) type ErasedValue = Arc<dyn Any + Send + Sync>;

/// Type-erased state broadcast to every observer of an entry
#[derive(Clone)]
pub(crate) struct RawState {
    pub status: QueryStatus,
    pub data: Option<ErasedValue>,
    pub error: Option<FetchError>,
    pub data_updated_at: Option<DateTime<Utc>>,
    pub error_updated_at: Option<DateTime<Utc>>,
    pub is_fetching: bool,
}

impl RawState {
    pub fn idle() -> Self {
        Self {
            status: QueryStatus::Idle,
            data: None,
            error: None,
            data_updated_at: None,
            error_updated_at: None,
            is_fetching: false,
        }
    }

    pub fn begin_fetch(&mut self) {
        self.status = QueryStatus::Loading;
        self.is_fetching = true;
    }

    pub fn resolve(&mut self, value: ErasedValue) {
        self.status = QueryStatus::Success;
        self.data = Some(value);
        self.error = None;
        self.data_updated_at = Some(Utc::now());
        self.is_fetching = false;
    }

    /// Prior data is kept so callers can keep showing the last good value
    pub fn reject(&mut self, error: FetchError) {
        self.status = QueryStatus::Error;
        self.error = Some(error);
        self.error_updated_at = Some(Utc::now());
        self.is_fetching = false;
    }

    pub fn typed<T: Send + Sync + 'static>(&self) -> QueryState<T> {
        QueryState {
            status: self.status,
            data: self.data.clone().and_then(|value| value.downcast::<T>().ok()),
            error: self.error.clone(),
            data_updated_at: self.data_updated_at,
            error_updated_at: self.error_updated_at,
            is_fetching: self.is_fetching,
        }
    }
}

/// Read-only `{data, is_loading, error}` view of a key
#[derive(Debug)]
pub struct QueryState<T> {
    pub status: QueryStatus,
    pub data: Option<Arc<T>>,
    pub error: Option<FetchError>,
    pub data_updated_at: Option<DateTime<Utc>>,
    pub error_updated_at: Option<DateTime<Utc>>,
    pub is_fetching: bool,
}

impl<T> QueryState<T> {
    pub fn idle() -> Self {
        Self {
            status: QueryStatus::Idle,
            data: None,
            error: None,
            data_updated_at: None,
            error_updated_at: None,
            is_fetching: false,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.status == QueryStatus::Idle
    }

    pub fn is_loading(&self) -> bool {
        self.status == QueryStatus::Loading
    }

    pub fn is_success(&self) -> bool {
        self.status == QueryStatus::Success
    }

    pub fn is_error(&self) -> bool {
        self.status == QueryStatus::Error
    }

    pub fn data(&self) -> Option<&T> {
        self.data.as_deref()
    }

    pub fn error(&self) -> Option<&FetchError> {
        self.error.as_ref()
    }
}

impl<T> Clone for QueryState<T> {
    fn clone(&self) -> Self {
        Self {
            status: self.status,
            data: self.data.clone(),
            error: self.error.clone(),
            data_updated_at: self.data_updated_at,
            error_updated_at: self.error_updated_at,
            is_fetching: self.is_fetching,
        }
    }
}

impl<T> Default for QueryState<T> {
    fn default() -> Self {
        Self::idle()
    }
}
