//! Per-query parameters
//!
//! This module defines the QueryOptions struct for overriding
//! cache-wide staleness and retry settings on a single query.

use config::QueryConfig;
use std::time::Duration;

/// Query options overriding the cache-wide configuration for one key
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOptions {
    /// Age after which data is refetched for a new observer
    pub stale_time: Option<Duration>,
    /// Extra attempts after a failed fetch
    pub retry: Option<u32>,
    /// Delay between attempts
    pub retry_delay: Option<Duration>,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = Some(stale_time);
        self
    }

    pub fn with_retry(mut self, retry: u32, retry_delay: Duration) -> Self {
        self.retry = Some(retry);
        self.retry_delay = Some(retry_delay);
        self
    }

    /// Overlay the fields `other` sets; unset fields keep their value
    pub fn merge(&mut self, other: QueryOptions) {
        if other.stale_time.is_some() {
            self.stale_time = other.stale_time;
        }
        if other.retry.is_some() {
            self.retry = other.retry;
        }
        if other.retry_delay.is_some() {
            self.retry_delay = other.retry_delay;
        }
    }

    pub(crate) fn stale_time_or(&self, config: &QueryConfig) -> Duration {
        self.stale_time.unwrap_or_else(|| config.stale_time())
    }

    pub(crate) fn retry_or(&self, config: &QueryConfig) -> u32 {
        self.retry.unwrap_or(config.retry)
    }

    pub(crate) fn retry_delay_or(&self, config: &QueryConfig) -> Duration {
        self.retry_delay.unwrap_or_else(|| config.retry_delay())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_keeps_unset_fields() {
        let mut options = QueryOptions::new()
            .with_stale_time(Duration::from_secs(3600))
            .with_retry(2, Duration::from_millis(50));

        options.merge(QueryOptions::default());
        assert_eq!(options.stale_time, Some(Duration::from_secs(3600)));
        assert_eq!(options.retry, Some(2));

        options.merge(QueryOptions::new().with_stale_time(Duration::from_secs(1)));
        assert_eq!(options.stale_time, Some(Duration::from_secs(1)));
        assert_eq!(options.retry_delay, Some(Duration::from_millis(50)));
    }
}
