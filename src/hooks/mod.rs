//! Query hooks
//!
//! A `QueryHook` binds a key builder, an async fetch function and an
//! activation predicate to the shared cache. Callers feed it identifiers and
//! read back a `{data, is_loading, error}` view; the hook decides whether to
//! attach to a key, which key, and when to let go of the previous one.

pub mod defi;

use futures::future::BoxFuture;
use query_cache::{FetchError, Observer, QueryCache, QueryOptions, QueryState, QueryStatus};
use query_key::QueryKey;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

type KeyFn<I> = Arc<dyn Fn(&I) -> QueryKey + Send + Sync>;
type EnabledFn<I> = Arc<dyn Fn(&I) -> bool + Send + Sync>;
type FetchFn<I, T> = Arc<dyn Fn(I) -> BoxFuture<'static, anyhow::Result<T>> + Send + Sync>;

pub struct QueryHook<I, T> {
    cache: QueryCache,
    key_fn: KeyFn<I>,
    enabled_fn: Option<EnabledFn<I>>,
    fetch_fn: FetchFn<I, T>,
    options: QueryOptions,
    identifiers: Option<I>,
    current: Option<Observer<T>>,
    /// Set when the cache refused to attach (type mismatch, shut down)
    attach_error: Option<FetchError>,
}

impl<I, T> QueryHook<I, T>
where
    I: Clone + Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    /// Create an inactive hook; nothing runs until `set_identifiers`
    pub fn new<K, F, Fut>(cache: QueryCache, key_fn: K, fetch: F) -> Self
    where
        K: Fn(&I) -> QueryKey + Send + Sync + 'static,
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        Self {
            cache,
            key_fn: Arc::new(key_fn),
            enabled_fn: None,
            fetch_fn: Arc::new(move |identifiers: I| -> BoxFuture<'static, anyhow::Result<T>> {
                Box::pin(fetch(identifiers))
            }),
            options: QueryOptions::default(),
            identifiers: None,
            current: None,
            attach_error: None,
        }
    }

    /// Extra activation predicate, checked after the default one
    /// (every identifier in the key present)
    pub fn enabled<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&I) -> bool + Send + Sync + 'static,
    {
        self.enabled_fn = Some(Arc::new(predicate));
        self
    }

    pub fn with_options(mut self, options: QueryOptions) -> Self {
        self.options = options;
        self
    }

    pub fn is_enabled_for(&self, identifiers: &I) -> bool {
        (self.key_fn)(identifiers).is_complete()
            && self
                .enabled_fn
                .as_ref()
                .is_none_or(|predicate| predicate(identifiers))
    }

    /// Re-evaluate the hook for new identifiers.
    ///
    /// With the predicate false the hook detaches and reports idle. With the
    /// same key as before nothing happens. Otherwise it attaches to the new
    /// key, starting or joining its invocation, and drops the old observer;
    /// whatever the old key resolves to is never reflected here.
    pub fn set_identifiers(&mut self, identifiers: I) {
        let key = (self.key_fn)(&identifiers);
        let enabled = self.is_enabled_for(&identifiers);
        self.identifiers = Some(identifiers.clone());

        if !enabled {
            if let Some(previous) = self.current.take() {
                crate::debug_log!("Query {} disabled", previous.key());
                drop(previous);
            }
            self.attach_error = None;
            return;
        }

        if self.attach_error.is_none()
            && self
                .current
                .as_ref()
                .is_some_and(|observer| observer.key() == &key && observer.is_attached())
        {
            return;
        }

        let fetch = Arc::clone(&self.fetch_fn);
        let fetcher = move || fetch(identifiers.clone());
        match self.cache.observe_with(key.clone(), fetcher, self.options.clone()) {
            Ok(observer) => {
                crate::debug_log!("Query hook attached to {}", key);
                self.current = Some(observer);
                self.attach_error = None;
            }
            Err(error) => {
                tracing::warn!("Query hook could not attach to {}: {}", key, error);
                self.current = None;
                self.attach_error = Some(error.into());
            }
        }
    }

    pub fn identifiers(&self) -> Option<&I> {
        self.identifiers.as_ref()
    }

    /// Key the hook is attached to, `None` while disabled
    pub fn key(&self) -> Option<&QueryKey> {
        self.current.as_ref().map(Observer::key)
    }

    pub fn is_active(&self) -> bool {
        self.current.is_some()
    }

    pub fn state(&self) -> QueryState<T> {
        if let Some(error) = &self.attach_error {
            let mut state = QueryState::idle();
            state.status = QueryStatus::Error;
            state.error = Some(error.clone());
            return state;
        }
        self.current
            .as_ref()
            .map(Observer::state)
            .unwrap_or_else(QueryState::idle)
    }

    pub fn data(&self) -> Option<Arc<T>> {
        self.state().data
    }

    pub fn error(&self) -> Option<FetchError> {
        self.state().error
    }

    pub fn is_loading(&self) -> bool {
        self.state().is_loading()
    }

    /// Explicitly refetch the current key. Returns `false` while disabled.
    /// If the entry was removed meanwhile, the hook re-attaches, which
    /// starts a fresh invocation.
    pub fn refetch(&mut self) -> bool {
        let Some(observer) = &self.current else {
            return false;
        };
        match self.cache.refetch(observer.key()) {
            Ok(true) => true,
            Ok(false) => {
                let Some(identifiers) = self.identifiers.clone() else {
                    return false;
                };
                crate::debug_log!("Entry {} is gone, re-attaching", observer.key());
                self.set_identifiers(identifiers);
                self.current
                    .as_ref()
                    .is_some_and(|observer| observer.is_attached())
            }
            Err(error) => {
                tracing::warn!("Refetch of {} failed: {}", observer.key(), error);
                false
            }
        }
    }

    /// Wait until the current key has no outstanding invocation
    pub async fn settled(&mut self) -> QueryState<T> {
        match self.current.as_mut() {
            Some(observer) => observer.settled().await,
            None => self.state(),
        }
    }

    /// Wait for the next state change of the current key.
    /// Returns `None` when disabled or once the entry is gone.
    pub async fn changed(&mut self) -> Option<QueryState<T>> {
        self.current.as_mut()?.changed().await
    }
}

impl<I: fmt::Debug, T> fmt::Debug for QueryHook<I, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryHook")
            .field("identifiers", &self.identifiers)
            .field("current", &self.current)
            .field("attach_error", &self.attach_error)
            .finish()
    }
}
