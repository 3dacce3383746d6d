use crate::errors::SignalError;
use crate::event::CacheEvent;
use crate::types::{CallbackId, EventCallback};
use config::SignalConfig;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Signal manager for query cache event notifications
pub struct SignalManager {
    callbacks: std::sync::RwLock<Vec<(CallbackId, EventCallback)>>,
    next_id: AtomicU64,
    config: SignalConfig,
}

impl std::fmt::Debug for SignalManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalManager")
            .field("callback_count", &self.callback_count())
            .field("max_callbacks", &self.config.max_callbacks)
            .finish()
    }
}

impl SignalManager {
    pub fn new(config: SignalConfig) -> Self {
        Self {
            callbacks: std::sync::RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
            config,
        }
    }

    /// Add event callback
    pub fn add_callback<F>(&self, callback: F) -> Result<CallbackId, SignalError>
    where
        F: Fn(&CacheEvent) + Send + Sync + 'static,
    {
        let mut callbacks = self
            .callbacks
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        if callbacks.len() >= self.config.max_callbacks {
            return Err(SignalError::TooManyCallbacks(self.config.max_callbacks));
        }

        let id = CallbackId(self.next_id.fetch_add(1, Ordering::Relaxed));
        callbacks.push((id, Arc::new(callback)));
        Ok(id)
    }

    /// Remove a previously registered callback
    pub fn remove_callback(&self, id: CallbackId) -> Result<(), SignalError> {
        let mut callbacks = self
            .callbacks
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        let before = callbacks.len();
        callbacks.retain(|(cb_id, _)| *cb_id != id);
        if callbacks.len() == before {
            return Err(SignalError::CallbackNotFound(id.0));
        }
        Ok(())
    }

    /// Emit event to all subscribers
    pub fn emit(&self, event: CacheEvent) {
        // Snapshot so callbacks may register or remove callbacks themselves
        let snapshot: Vec<EventCallback> = match self.callbacks.read() {
            Ok(callbacks) => callbacks.iter().map(|(_, cb)| Arc::clone(cb)).collect(),
            Err(_) => {
                tracing::warn!("Signal callbacks lock poisoned, dropping {:?}", event.event_type);
                return;
            }
        };

        for callback in snapshot {
            callback(&event);
        }
    }

    /// Clear all callbacks
    pub fn clear_callbacks(&self) {
        if let Ok(mut callbacks) = self.callbacks.write() {
            callbacks.clear();
        }
    }

    /// Get number of registered callbacks
    pub fn callback_count(&self) -> usize {
        self.callbacks.read().map(|c| c.len()).unwrap_or(0)
    }
}

impl Default for SignalManager {
    fn default() -> Self {
        Self::new(SignalConfig::default())
    }
}
