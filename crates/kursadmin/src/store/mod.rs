//! Realtime document store abstraction.
//!
//! The panel talks to its backing store only through [`RealtimeStore`]:
//! subscribe to a path, read it once, and write to it with set, push or a
//! multi-path update. Two backends ship with the crate:
//!
//! - [`MemoryStore`]: an in-process tree, used by tests and demos.
//! - [`SqliteStore`]: the same tree persisted in `SQLite`, used by the CLI.

mod listeners;
mod memory;
mod sqlite;
pub mod tree;

#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::{Error, Result};

pub use listeners::{ChangeCallback, ListenerRegistry, Subscription};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Path of the schools collection.
pub const SCHOOLS_PATH: &str = "schools";

/// Path of the announcements collection.
pub const ANNOUNCEMENTS_PATH: &str = "announcements";

/// Path of the license fee table.
pub const LICENSE_FEES_PATH: &str = "licenseFees";

/// Placeholder replaced by the store's clock (epoch millis) at write time.
#[must_use]
pub fn server_timestamp() -> Value {
    let mut placeholder = Map::new();
    placeholder.insert(tree::SERVER_VALUE_KEY.to_string(), Value::from("timestamp"));
    Value::Object(placeholder)
}

/// A realtime, tree-structured document store.
///
/// Writes are applied atomically and pushed to every overlapping
/// subscription before the write call returns.
#[async_trait]
pub trait RealtimeStore: Send + Sync {
    /// Subscribe to a path.
    ///
    /// `on_change` is invoked immediately with the current value and again
    /// after every write that changes it. Dropping the returned handle
    /// unsubscribes.
    ///
    /// # Errors
    ///
    /// Returns a read error if the initial value cannot be loaded.
    async fn subscribe(&self, path: &str, on_change: ChangeCallback) -> Result<Subscription>;

    /// Read the value at a path once.
    ///
    /// # Errors
    ///
    /// Returns a read error if the store cannot be read.
    async fn get(&self, path: &str) -> Result<Option<Value>>;

    /// Replace the value at a path. `null` deletes.
    ///
    /// # Errors
    ///
    /// Returns a write error if the path is invalid or the write fails.
    async fn set(&self, path: &str, value: Value) -> Result<()>;

    /// Append a value under a new chronologically ordered key.
    ///
    /// # Errors
    ///
    /// Returns a write error if the path is invalid or the write fails.
    async fn push(&self, path: &str, value: Value) -> Result<String>;

    /// Apply several writes, keyed by paths relative to `path`, as one
    /// atomic operation. Untouched siblings are preserved.
    ///
    /// # Errors
    ///
    /// Returns a write error if any path is invalid, two paths overlap, or
    /// the write fails. In that case nothing is written.
    async fn update(&self, path: &str, updates: Map<String, Value>) -> Result<()>;
}

/// One resolved write: an absolute path and the value to store there.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Write {
    pub(crate) path: Vec<String>,
    pub(crate) value: Value,
}

impl Write {
    /// A single write with server values resolved.
    pub(crate) fn single(path: &str, mut value: Value, now_ms: i64) -> Result<Self> {
        let path = tree::parse_path(path)?;
        tree::resolve_server_values(&mut value, now_ms);
        Ok(Self { path, value })
    }

    /// Expand a multi-path update into writes.
    ///
    /// Rejects empty updates and keys where one path contains another.
    pub(crate) fn batch(base: &str, updates: Map<String, Value>, now_ms: i64) -> Result<Vec<Self>> {
        let base_path = tree::parse_path(base)?;
        let mut writes: Vec<Self> = Vec::with_capacity(updates.len());
        for (key, mut value) in updates {
            let relative = tree::parse_path(&key)?;
            if relative.is_empty() {
                return Err(Error::remote_write(base, "update key must not be empty"));
            }
            let mut path = base_path.clone();
            path.extend(relative);
            if let Some(other) = writes.iter().find(|w| tree::overlaps(&w.path, &path)) {
                return Err(Error::remote_write(
                    base,
                    format!(
                        "update paths '{}' and '{}' overlap",
                        tree::join(&other.path),
                        tree::join(&path)
                    ),
                ));
            }
            tree::resolve_server_values(&mut value, now_ms);
            writes.push(Self { path, value });
        }
        if writes.is_empty() {
            return Err(Error::remote_write(base, "update contains no paths"));
        }
        Ok(writes)
    }
}

/// Current time in epoch milliseconds, the store's clock.
pub(crate) fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
