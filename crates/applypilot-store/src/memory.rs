//! In-memory implementation of `SessionStore`.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tracing::debug;

use applypilot_contracts::error::PilotResult;
use applypilot_core::traits::SessionStore;

/// A `SessionStore` kept in a map behind a mutex.
///
/// Clones share the same map, which is how the background process and each
/// page context see one store in tests and in the demo.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<BTreeMap<String, Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every key currently stored, sorted.
    pub fn keys(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, Value>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SessionStore for MemoryStore {
    fn get(&self, key: &str) -> PilotResult<Option<Value>> {
        Ok(self.lock().get(key).cloned())
    }

    fn put(&self, key: &str, value: Value) -> PilotResult<()> {
        debug!(key = %key, "store put");
        self.lock().insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> PilotResult<()> {
        if self.lock().remove(key).is_some() {
            debug!(key = %key, "store remove");
        }
        Ok(())
    }
}
