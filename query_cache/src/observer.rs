//! Observers of a cache entry
//!
//! An `Observer` is one consumer's attachment to a key. It reads the entry's
//! broadcast state and detaches on drop, which starts the entry's gc clock
//! once the last observer is gone.

use crate::manager::Inner;
use crate::state::{QueryState, RawState};
use query_key::QueryKey;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Weak;
use tokio::sync::watch;

pub struct Observer<T> {
    key: QueryKey,
    entry_id: u64,
    receiver: watch::Receiver<RawState>,
    cache: Weak<Inner>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> Observer<T> {
    pub(crate) fn new(
        key: QueryKey,
        entry_id: u64,
        receiver: watch::Receiver<RawState>,
        cache: Weak<Inner>,
    ) -> Self {
        Self {
            key,
            entry_id,
            receiver,
            cache,
            _marker: PhantomData,
        }
    }

    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    /// False once the entry was removed, evicted or dropped by shutdown
    pub fn is_attached(&self) -> bool {
        self.receiver.has_changed().is_ok()
    }

    /// Snapshot of the entry's current state
    pub fn state(&self) -> QueryState<T> {
        self.receiver.borrow().typed::<T>()
    }

    /// Wait for the next state change. Returns `None` once the entry is gone.
    pub async fn changed(&mut self) -> Option<QueryState<T>> {
        self.receiver.changed().await.ok()?;
        Some(self.state())
    }

    /// Wait until no invocation is outstanding, then return the state.
    /// If the entry is removed meanwhile, the last observed state is returned.
    pub async fn settled(&mut self) -> QueryState<T> {
        let _ = self.receiver.wait_for(|state| !state.is_fetching).await;
        self.state()
    }
}

impl<T> fmt::Debug for Observer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observer")
            .field("key", &self.key)
            .field("entry_id", &self.entry_id)
            .finish()
    }
}

impl<T> Drop for Observer<T> {
    fn drop(&mut self) {
        if let Some(cache) = self.cache.upgrade() {
            cache.detach(&self.key, self.entry_id);
        }
    }
}
