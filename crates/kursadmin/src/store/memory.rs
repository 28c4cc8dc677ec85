//! In-process realtime store.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::debug;

use super::listeners::{ChangeCallback, ListenerRegistry, Subscription};
use super::tree::{self, PushIdGenerator};
use super::{now_ms, RealtimeStore, Write};
use crate::error::Result;

/// A realtime store holding its tree in memory.
///
/// Cheap to create; every instance is independent. Writes notify
/// subscribers synchronously before returning.
#[derive(Debug)]
pub struct MemoryStore {
    root: Mutex<Value>,
    ids: Mutex<PushIdGenerator>,
    listeners: Arc<ListenerRegistry>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::with_root(Value::Null)
    }

    /// Create a store seeded with an initial tree.
    #[must_use]
    pub fn with_root(root: Value) -> Self {
        let mut seeded = Value::Null;
        tree::set(&mut seeded, &[], root);
        Self {
            root: Mutex::new(seeded),
            ids: Mutex::new(PushIdGenerator::new()),
            listeners: ListenerRegistry::new(),
        }
    }

    /// A copy of the whole tree.
    #[must_use]
    pub fn snapshot(&self) -> Value {
        self.root().clone()
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.listeners.len()
    }

    fn root(&self) -> MutexGuard<'_, Value> {
        self.root.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn apply(&self, writes: Vec<Write>) {
        let mut root = self.root();
        let changed: Vec<Vec<String>> = writes.iter().map(|w| w.path.clone()).collect();
        for write in writes {
            tree::set(&mut root, &write.path, write.value);
        }
        let _dispatch = self.listeners.lock_dispatch();
        let pending = self.listeners.pending(&root, &changed);
        drop(root);
        for delivery in pending {
            delivery.deliver();
        }
    }
}

#[async_trait]
impl RealtimeStore for MemoryStore {
    async fn subscribe(&self, path: &str, on_change: ChangeCallback) -> Result<Subscription> {
        let segments = tree::segments(path);
        let root = self.root();
        let current = tree::get(&root, &segments).cloned();
        let _dispatch = self.listeners.lock_dispatch();
        let (subscription, initial) = self.listeners.register(segments, on_change, current);
        drop(root);
        initial.deliver();
        debug!(path, "subscribed");
        Ok(subscription)
    }

    async fn get(&self, path: &str) -> Result<Option<Value>> {
        let segments = tree::segments(path);
        Ok(tree::get(&self.root(), &segments).cloned())
    }

    async fn set(&self, path: &str, value: Value) -> Result<()> {
        let write = Write::single(path, value, now_ms())?;
        self.apply(vec![write]);
        Ok(())
    }

    async fn push(&self, path: &str, value: Value) -> Result<String> {
        let now = now_ms();
        let key = self
            .ids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .next_id(now);
        let write = Write::single(&format!("{path}/{key}"), value, now)?;
        self.apply(vec![write]);
        debug!(path, key, "pushed");
        Ok(key)
    }

    async fn update(&self, path: &str, updates: Map<String, Value>) -> Result<()> {
        let writes = Write::batch(path, updates, now_ms())?;
        debug!(path, paths = writes.len(), "applying update");
        self.apply(writes);
        Ok(())
    }
}
