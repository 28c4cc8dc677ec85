//! Store wrappers for exercising failure paths in tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::{ChangeCallback, MemoryStore, RealtimeStore, Subscription};
use crate::error::{Error, Result};

/// A [`MemoryStore`] whose operations can be made to fail on demand.
///
/// Also counts writes so tests can assert that nothing was attempted.
#[derive(Debug, Default)]
pub(crate) struct FailingStore {
    pub(crate) inner: MemoryStore,
    pub(crate) fail_push: AtomicBool,
    pub(crate) fail_update: AtomicBool,
    pub(crate) fail_get: AtomicBool,
    pub(crate) writes: AtomicUsize,
}

impl FailingStore {
    pub(crate) fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            ..Self::default()
        }
    }

    pub(crate) fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RealtimeStore for FailingStore {
    async fn subscribe(&self, path: &str, on_change: ChangeCallback) -> Result<Subscription> {
        self.inner.subscribe(path, on_change).await
    }

    async fn get(&self, path: &str) -> Result<Option<Value>> {
        if self.fail_get.load(Ordering::SeqCst) {
            return Err(Error::remote_read(path, "permission denied"));
        }
        self.inner.get(path).await
    }

    async fn set(&self, path: &str, value: Value) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_update.load(Ordering::SeqCst) {
            return Err(Error::remote_write(path, "permission denied"));
        }
        self.inner.set(path, value).await
    }

    async fn push(&self, path: &str, value: Value) -> Result<String> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_push.load(Ordering::SeqCst) {
            return Err(Error::remote_write(path, "permission denied"));
        }
        self.inner.push(path, value).await
    }

    async fn update(&self, path: &str, updates: Map<String, Value>) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_update.load(Ordering::SeqCst) {
            return Err(Error::remote_write(path, "permission denied"));
        }
        self.inner.update(path, updates).await
    }
}
