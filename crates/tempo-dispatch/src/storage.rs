//! Router-owned named storage.
//!
//! Handlers that need state outliving one invocation (which page a
//! paginated help message is showing, who may flip it) get a [`Store`]:
//! an independent concurrency-safe key/value map registered by name on
//! the router at setup time. Keys are handler-chosen composite strings
//! (conventionally scope-id + message-id + user-id); values are JSON so
//! any serde-friendly shape fits. Storage is process-memory only and is
//! rebuilt on restart.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;

/// One named key/value map. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct Store {
    inner: Arc<RwLock<HashMap<String, Value>>>,
}

impl Store {
    /// Inserts or replaces a value, returning the previous one.
    pub fn insert(&self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.inner.write().insert(key.into(), value)
    }

    /// Returns a clone of the value for `key`.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner.read().get(key).cloned()
    }

    /// Removes and returns the value for `key`.
    pub fn remove(&self, key: &str) -> Option<Value> {
        self.inner.write().remove(key)
    }

    /// Whether `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.read().contains_key(key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

/// The router's mapping from storage name to independent [`Store`]s.
#[derive(Debug, Default)]
pub struct NamedStorage {
    stores: RwLock<HashMap<String, Store>>,
}

impl NamedStorage {
    /// Creates an empty facility.
    pub fn new() -> Self {
        Self::default()
    }

    /// Initialises a store under `name`. A no-op when it already exists;
    /// existing contents are kept.
    pub fn init(&self, name: impl Into<String>) {
        self.stores.write().entry(name.into()).or_default();
    }

    /// Fetches the store registered under `name`.
    pub fn get(&self, name: &str) -> Option<Store> {
        self.stores.read().get(name).cloned()
    }

    /// Names of all initialised stores.
    pub fn names(&self) -> Vec<String> {
        self.stores.read().keys().cloned().collect()
    }
}
