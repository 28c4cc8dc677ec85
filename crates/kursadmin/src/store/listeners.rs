//! Live subscription bookkeeping shared by the store backends.
//!
//! Backends register a listener per `subscribe` call and, after each
//! committed write, collect the listeners whose path overlaps the written
//! paths. Delivery happens under the registry's dispatch lock so listeners
//! observe writes in commit order.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use serde_json::Value;
use tracing::trace;

use super::tree;

/// Callback invoked with the current value at a subscribed path.
///
/// `None` means the path holds no data. Callbacks run on the writer's
/// thread and must not call back into the store.
pub type ChangeCallback = Box<dyn Fn(Option<&Value>) + Send + Sync>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct ListenerState {
    callback: Option<ChangeCallback>,
    last: Option<Value>,
    delivered: bool,
}

struct Listener {
    path: Vec<String>,
    state: Mutex<ListenerState>,
}

/// A value computed for a listener, waiting to be delivered.
pub(crate) struct Pending {
    listener: Arc<Listener>,
    value: Option<Value>,
}

impl Pending {
    /// Deliver the value unless it equals what the listener last saw.
    ///
    /// The first delivery always fires, even for an empty path.
    pub(crate) fn deliver(self) {
        let mut state = lock(&self.listener.state);
        if state.delivered && state.last == self.value {
            return;
        }
        let ListenerState {
            callback,
            last,
            delivered,
        } = &mut *state;
        if let Some(callback) = callback {
            callback(self.value.as_ref());
            *last = self.value;
            *delivered = true;
        }
    }
}

/// Registry of live listeners for one store.
#[derive(Default)]
pub struct ListenerRegistry {
    next_id: AtomicU64,
    listeners: Mutex<HashMap<u64, Arc<Listener>>>,
    dispatch: Mutex<()>,
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.len())
            .finish_non_exhaustive()
    }
}

impl ListenerRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Number of live listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.listeners).len()
    }

    /// Check if there are no live listeners.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Serialize deliveries. Backends take this before releasing their data
    /// lock so listeners see writes in commit order.
    pub(crate) fn lock_dispatch(&self) -> MutexGuard<'_, ()> {
        lock(&self.dispatch)
    }

    /// Register a listener and return its handle plus the initial delivery.
    pub(crate) fn register(
        self: &Arc<Self>,
        path: Vec<String>,
        callback: ChangeCallback,
        current: Option<Value>,
    ) -> (Subscription, Pending) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let listener = Arc::new(Listener {
            path: path.clone(),
            state: Mutex::new(ListenerState {
                callback: Some(callback),
                last: None,
                delivered: false,
            }),
        });
        lock(&self.listeners).insert(id, Arc::clone(&listener));
        trace!(id, path = %tree::join(&path), "listener registered");

        let subscription = Subscription {
            registry: Arc::downgrade(self),
            id,
            path: tree::join(&path),
            released: false,
        };
        let pending = Pending {
            listener,
            value: current,
        };
        (subscription, pending)
    }

    /// Values for every listener overlapping one of the changed paths.
    ///
    /// Pass an empty path in `changed` to target every listener.
    pub(crate) fn pending(&self, root: &Value, changed: &[Vec<String>]) -> Vec<Pending> {
        lock(&self.listeners)
            .values()
            .filter(|listener| changed.iter().any(|path| tree::overlaps(&listener.path, path)))
            .map(|listener| Pending {
                listener: Arc::clone(listener),
                value: tree::get(root, &listener.path).cloned(),
            })
            .collect()
    }

    /// Remove a listener. Blocks until an in-flight delivery to it returns;
    /// no delivery starts afterwards.
    fn release(&self, id: u64) {
        let removed = lock(&self.listeners).remove(&id);
        if let Some(listener) = removed {
            lock(&listener.state).callback = None;
            trace!(id, "listener released");
        }
    }
}

/// Handle to a live subscription.
///
/// Dropping the handle (or calling [`Subscription::release`]) unsubscribes.
/// Once release returns, the callback is never invoked again.
#[derive(Debug)]
pub struct Subscription {
    registry: Weak<ListenerRegistry>,
    id: u64,
    path: String,
    released: bool,
}

impl Subscription {
    /// The subscribed path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Unsubscribe now.
    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Some(registry) = self.registry.upgrade() {
            registry.release(self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release_inner();
    }
}
