//! Query cache manager implementation
//!
//! This module provides the process-wide QueryCache: a map from query key to
//! entry record, one tracked invocation per key, and the generation counter
//! that keeps superseded invocations from writing their results.

use crate::errors::{FetchError, QueryError};
use crate::observer::Observer;
use crate::params::QueryOptions;
use crate::state::{ErasedValue, QueryState, QueryStatus, RawState};
use config::{AppConfig, QueryConfig};
use futures::future::BoxFuture;
use query_key::QueryKey;
use query_signals::{CacheEvent, EventType, SignalManager};
use std::any::{TypeId, type_name};
use std::collections::HashMap;
use std::collections::hash_map;
use std::fmt::Debug;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::Instant;

type ErasedFetcher =
    Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<ErasedValue>> + Send + Sync>;

/// Cache entry record for one key
struct Entry {
    /// Distinguishes a re-created entry from a removed one under the same key
    id: u64,
    type_id: TypeId,
    type_name: &'static str,
    state: watch::Sender<RawState>,
    fetcher: ErasedFetcher,
    options: QueryOptions,
    /// Bumped by every invocation; completions carrying an older value are stale
    generation: u64,
    in_flight: Option<AbortHandle>,
    observers: usize,
    fetched_at: Option<Instant>,
    idle_since: Option<Instant>,
    invalidated: bool,
}

impl Entry {
    fn is_stale(&self, config: &QueryConfig) -> bool {
        if self.invalidated {
            return true;
        }
        match self.fetched_at {
            Some(at) => at.elapsed() >= self.options.stale_time_or(config),
            None => true,
        }
    }

    /// Whether a newly attached observer should start an invocation
    fn needs_fetch(&self, config: &QueryConfig) -> bool {
        if self.in_flight.is_some() {
            return false;
        }
        match self.state.borrow().status {
            QueryStatus::Success => self.is_stale(config),
            _ => true,
        }
    }

    fn check_type<T: 'static>(&self, key: &QueryKey) -> Result<(), QueryError> {
        if self.type_id != TypeId::of::<T>() {
            return Err(QueryError::TypeMismatch {
                key: key.to_string(),
                expected: self.type_name,
            });
        }
        Ok(())
    }
}

pub(crate) struct Inner {
    entries: Mutex<HashMap<QueryKey, Entry>>,
    config: QueryConfig,
    signals: Arc<SignalManager>,
    gc_task: Mutex<Option<JoinHandle<()>>>,
    next_entry_id: AtomicU64,
    shut_down: AtomicBool,
}

impl Inner {
    fn lock_entries(&self) -> MutexGuard<'_, HashMap<QueryKey, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Events are emitted only after the entries lock is released
    fn emit(&self, events: Vec<CacheEvent>) {
        for event in events {
            self.signals.emit(event);
        }
    }

    /// Start a new invocation for `entry`, superseding any outstanding one
    fn begin_fetch(
        self: &Arc<Self>,
        runtime: &Handle,
        key: &QueryKey,
        entry: &mut Entry,
    ) -> CacheEvent {
        if let Some(previous) = entry.in_flight.take() {
            previous.abort();
        }

        entry.generation += 1;
        entry.invalidated = false;
        let generation = entry.generation;
        entry.state.send_modify(RawState::begin_fetch);

        let task = runtime.spawn(run_invocation(
            Arc::downgrade(self),
            key.clone(),
            entry.id,
            generation,
            Arc::clone(&entry.fetcher),
            entry.options.retry_or(&self.config),
            entry.options.retry_delay_or(&self.config),
        ));
        entry.in_flight = Some(task.abort_handle());

        crate::debug_log!("Started invocation {} for {}", generation, key);
        CacheEvent::new(EventType::FetchStarted, key.clone()).with_generation(generation)
    }

    /// Completion path of an invocation; the only writer of fetched results.
    /// Generations restart with a re-created entry, so the entry id must match too.
    fn complete(
        &self,
        key: &QueryKey,
        entry_id: u64,
        generation: u64,
        result: Result<ErasedValue, FetchError>,
    ) {
        let event = {
            let mut entries = self.lock_entries();
            match entries.get_mut(key) {
                Some(entry) if entry.id == entry_id && entry.generation == generation => {
                    entry.in_flight = None;
                    match result {
                        Ok(value) => {
                            entry.fetched_at = Some(Instant::now());
                            entry.state.send_modify(|state| state.resolve(value));
                            crate::debug_log!("Invocation {} for {} succeeded", generation, key);
                            CacheEvent::new(EventType::FetchSucceeded, key.clone())
                                .with_generation(generation)
                        }
                        Err(error) => {
                            tracing::warn!("Query {} failed: {}", key, error);
                            let message = error.to_string();
                            entry.state.send_modify(|state| state.reject(error));
                            CacheEvent::new(EventType::FetchFailed, key.clone())
                                .with_generation(generation)
                                .with_message(message)
                        }
                    }
                }
                _ => {
                    crate::debug_log!("Discarding stale result {} for {}", generation, key);
                    CacheEvent::new(EventType::StaleDiscarded, key.clone()).with_generation(generation)
                }
            }
        };
        self.signals.emit(event);
    }

    pub(crate) fn detach(&self, key: &QueryKey, entry_id: u64) {
        let mut entries = self.lock_entries();
        if let Some(entry) = entries.get_mut(key) {
            if entry.id != entry_id {
                return;
            }
            entry.observers = entry.observers.saturating_sub(1);
            crate::trace_log!("Observer detached from {}, {} left", key, entry.observers);
            if entry.observers == 0 {
                entry.idle_since = Some(Instant::now());
            }
        }
    }

    fn collect_garbage(&self) -> usize {
        let gc_time = self.config.gc_time();
        let evicted: Vec<QueryKey> = {
            let mut entries = self.lock_entries();
            let expired: Vec<QueryKey> = entries
                .iter()
                .filter(|(_, entry)| {
                    entry.observers == 0
                        && entry.in_flight.is_none()
                        && entry.idle_since.is_some_and(|at| at.elapsed() >= gc_time)
                })
                .map(|(key, _)| key.clone())
                .collect();
            for key in &expired {
                entries.remove(key);
            }
            expired
        };

        let count = evicted.len();
        if count > 0 {
            tracing::info!("Evicted {} idle query entries", count);
        }
        self.emit(
            evicted
                .into_iter()
                .map(|key| CacheEvent::new(EventType::Evicted, key))
                .collect(),
        );
        count
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Ok(task) = self.gc_task.get_mut() {
            if let Some(task) = task.take() {
                task.abort();
            }
        }
    }
}

async fn run_invocation(
    inner: Weak<Inner>,
    key: QueryKey,
    entry_id: u64,
    generation: u64,
    fetcher: ErasedFetcher,
    retry: u32,
    retry_delay: Duration,
) {
    let mut attempt = 0;
    let result = loop {
        match fetcher().await {
            Ok(value) => break Ok(value),
            Err(error) if attempt < retry => {
                attempt += 1;
                let Some(cache) = inner.upgrade() else {
                    return;
                };
                cache.signals.emit(
                    CacheEvent::new(EventType::FetchRetried, key.clone())
                        .with_generation(generation)
                        .with_message(format!("attempt {} of {}: {:#}", attempt, retry, error)),
                );
                drop(cache);
                tokio::time::sleep(retry_delay).await;
            }
            Err(error) => break Err(FetchError::new(error)),
        }
    };

    if let Some(cache) = inner.upgrade() {
        cache.complete(&key, entry_id, generation, result);
    }
}

fn erase<T, F, Fut>(fetcher: F) -> ErasedFetcher
where
    T: Send + Sync + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
{
    Arc::new(move || {
        let fut = fetcher();
        Box::pin(async move { fut.await.map(|value| Arc::new(value) as ErasedValue) })
    })
}

/// Process-wide query cache
#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<Inner>,
}

impl Debug for QueryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entry_count = match self.inner.entries.try_lock() {
            Ok(entries) => entries.len().to_string(),
            Err(_) => "locked".to_string(),
        };

        f.debug_struct("QueryCache")
            .field("config", &self.inner.config)
            .field("entries", &entry_count)
            .field("shut_down", &self.inner.shut_down.load(Ordering::SeqCst))
            .finish()
    }
}

impl QueryCache {
    /// Create a new query cache
    pub fn new(config: QueryConfig, signals: Arc<SignalManager>) -> Self {
        Self {
            inner: Arc::new(Inner {
                entries: Mutex::new(HashMap::new()),
                config,
                signals,
                gc_task: Mutex::new(None),
                next_entry_id: AtomicU64::new(1),
                shut_down: AtomicBool::new(false),
            }),
        }
    }

    /// Create a query cache and its signal manager from application config
    pub fn from_config(config: &AppConfig) -> Self {
        let signals = Arc::new(SignalManager::new(config.signal.clone()));
        Self::new(config.query.clone(), signals)
    }

    fn ensure_running(&self) -> Result<Handle, QueryError> {
        if self.inner.shut_down.load(Ordering::SeqCst) {
            return Err(QueryError::ShutDown);
        }
        Handle::try_current().map_err(|_| QueryError::NoRuntime)
    }

    /// Attach an observer to `key`, starting an invocation if needed
    pub fn observe<T, F, Fut>(&self, key: QueryKey, fetcher: F) -> Result<Observer<T>, QueryError>
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        self.observe_with(key, fetcher, QueryOptions::default())
    }

    /// Attach an observer with per-query options.
    ///
    /// Options are merged into the entry's: fields the new observer sets
    /// replace the current ones, unset fields keep them.
    ///
    /// An invocation starts when the key has no entry, or its entry is
    /// errored, stale or invalidated and nothing is in flight. Otherwise the
    /// observer joins the outstanding invocation or the settled value, so
    /// concurrent observers of one key share a single fetch.
    pub fn observe_with<T, F, Fut>(
        &self,
        key: QueryKey,
        fetcher: F,
        options: QueryOptions,
    ) -> Result<Observer<T>, QueryError>
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        let runtime = self.ensure_running()?;
        let fetcher = erase(fetcher);
        let mut events = Vec::new();

        let observer = {
            let mut entries = self.inner.lock_entries();
            let entry = match entries.entry(key.clone()) {
                hash_map::Entry::Occupied(occupied) => {
                    let entry = occupied.into_mut();
                    entry.check_type::<T>(&key)?;
                    entry.fetcher = fetcher;
                    entry.options.merge(options);
                    entry
                }
                hash_map::Entry::Vacant(vacant) => vacant.insert(Entry {
                    id: self.inner.next_entry_id.fetch_add(1, Ordering::Relaxed),
                    type_id: TypeId::of::<T>(),
                    type_name: type_name::<T>(),
                    state: watch::Sender::new(RawState::idle()),
                    fetcher,
                    options,
                    generation: 0,
                    in_flight: None,
                    observers: 0,
                    fetched_at: None,
                    idle_since: None,
                    invalidated: false,
                }),
            };

            entry.observers += 1;
            entry.idle_since = None;
            if entry.needs_fetch(&self.inner.config) {
                events.push(self.inner.begin_fetch(&runtime, &key, entry));
            }

            Observer::new(
                key,
                entry.id,
                entry.state.subscribe(),
                Arc::downgrade(&self.inner),
            )
        };

        self.inner.emit(events);
        Ok(observer)
    }

    /// One-shot fetch sharing the cache: returns fresh cached data, joins an
    /// outstanding invocation, or starts one and waits for it to settle
    pub async fn fetch_query<T, F, Fut>(&self, key: QueryKey, fetcher: F) -> Result<Arc<T>, QueryError>
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        let mut observer = self.observe(key.clone(), fetcher)?;
        let state = observer.settled().await;

        match state.status {
            QueryStatus::Success => state.data.ok_or(QueryError::NotFound(key.to_string())),
            QueryStatus::Error => Err(state
                .error
                .map(QueryError::Fetch)
                .unwrap_or(QueryError::Cancelled(key.to_string()))),
            _ => Err(QueryError::Cancelled(key.to_string())),
        }
    }

    /// Force a new invocation of an existing entry with its last fetcher
    pub fn refetch(&self, key: &QueryKey) -> Result<bool, QueryError> {
        let runtime = self.ensure_running()?;
        let event = {
            let mut entries = self.inner.lock_entries();
            match entries.get_mut(key) {
                Some(entry) => self.inner.begin_fetch(&runtime, key, entry),
                None => return Ok(false),
            }
        };
        self.inner.signals.emit(event);
        Ok(true)
    }

    /// Mark one entry stale
    pub fn invalidate(&self, key: &QueryKey) -> Result<bool, QueryError> {
        Ok(self.invalidate_matching(|candidate| candidate == key)? > 0)
    }

    /// Mark every entry whose key starts with `prefix` stale
    pub fn invalidate_prefix(&self, prefix: &QueryKey) -> Result<usize, QueryError> {
        self.invalidate_matching(|candidate| candidate.starts_with(prefix))
    }

    fn invalidate_matching(
        &self,
        matches: impl Fn(&QueryKey) -> bool,
    ) -> Result<usize, QueryError> {
        let runtime = self.ensure_running()?;
        let mut events = Vec::new();
        let mut count = 0;

        {
            let mut entries = self.inner.lock_entries();
            for (key, entry) in entries.iter_mut() {
                if !matches(key) {
                    continue;
                }
                count += 1;
                entry.invalidated = true;
                events.push(CacheEvent::new(EventType::Invalidated, key.clone()));

                // Unobserved entries refetch when the next observer attaches
                if self.inner.config.refetch_on_invalidate && entry.observers > 0 {
                    events.push(self.inner.begin_fetch(&runtime, key, entry));
                }
            }
        }

        self.inner.emit(events);
        Ok(count)
    }

    /// Typed snapshot of an entry, if one exists
    pub fn get_state<T: Send + Sync + 'static>(
        &self,
        key: &QueryKey,
    ) -> Result<Option<QueryState<T>>, QueryError> {
        let entries = self.inner.lock_entries();
        match entries.get(key) {
            Some(entry) => {
                entry.check_type::<T>(key)?;
                Ok(Some(entry.state.borrow().typed::<T>()))
            }
            None => Ok(None),
        }
    }

    pub fn get_query_data<T: Send + Sync + 'static>(
        &self,
        key: &QueryKey,
    ) -> Result<Option<Arc<T>>, QueryError> {
        Ok(self.get_state::<T>(key)?.and_then(|state| state.data))
    }

    /// Drop an entry, cancelling its outstanding invocation
    pub fn remove(&self, key: &QueryKey) -> bool {
        let removed = self.inner.lock_entries().remove(key);
        match removed {
            Some(entry) => {
                if let Some(task) = entry.in_flight {
                    task.abort();
                }
                self.inner
                    .signals
                    .emit(CacheEvent::new(EventType::Removed, key.clone()));
                true
            }
            None => false,
        }
    }

    /// Evict entries that have had no observer for longer than `gc_time`
    pub fn collect_garbage(&self) -> usize {
        self.inner.collect_garbage()
    }

    /// Spawn the background collector; a no-op when it is already running
    pub fn start_gc(&self) -> Result<(), QueryError> {
        let runtime = self.ensure_running()?;
        let mut task = self
            .inner
            .gc_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if task.as_ref().is_some_and(|t| !t.is_finished()) {
            return Ok(());
        }

        let cache = Arc::downgrade(&self.inner);
        let period = self.inner.config.gc_interval();
        *task = Some(runtime.spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match cache.upgrade() {
                    Some(inner) => {
                        inner.collect_garbage();
                    }
                    None => break,
                }
            }
        }));

        tracing::info!("Query cache collector started, sweeping every {:?}", period);
        Ok(())
    }

    /// Stop the collector, cancel every invocation and drop all entries.
    /// Later operations report `QueryError::ShutDown`.
    pub fn shutdown(&self) {
        if self.inner.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }

        if let Some(task) = self
            .inner
            .gc_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.abort();
        }

        let drained: Vec<(QueryKey, Entry)> = self.inner.lock_entries().drain().collect();
        for (_, entry) in &drained {
            if let Some(task) = &entry.in_flight {
                task.abort();
            }
        }

        tracing::info!("Query cache shut down, dropped {} entries", drained.len());
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.shut_down.load(Ordering::SeqCst)
    }

    pub fn contains(&self, key: &QueryKey) -> bool {
        self.inner.lock_entries().contains_key(key)
    }

    pub fn keys(&self) -> Vec<QueryKey> {
        self.inner.lock_entries().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock_entries().is_empty()
    }

    /// Number of observers attached to `key`
    pub fn observer_count(&self, key: &QueryKey) -> usize {
        self.inner
            .lock_entries()
            .get(key)
            .map(|entry| entry.observers)
            .unwrap_or(0)
    }

    /// Get current configuration
    pub fn config(&self) -> &QueryConfig {
        &self.inner.config
    }

    pub fn signals(&self) -> &Arc<SignalManager> {
        &self.inner.signals
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}
