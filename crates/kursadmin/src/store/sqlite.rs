//! Realtime store persisted in `SQLite`.
//!
//! Each top-level key of the tree is one row in the `nodes` table. A write
//! loads the tree, applies every change, and saves the touched rows in a
//! single transaction, which is what makes multi-path updates atomic.
//!
//! Subscribers are notified of writes made through this instance right
//! away. Writes committed by other processes are picked up by
//! [`SqliteStore::refresh`].

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::{Map, Value};
use tracing::{debug, trace};

use super::listeners::{ChangeCallback, ListenerRegistry, Subscription};
use super::tree::{self, PushIdGenerator};
use super::{now_ms, RealtimeStore, Write};
use crate::db;
use crate::error::{Error, Result};

/// A realtime store backed by a `SQLite` database file.
#[derive(Debug)]
pub struct SqliteStore {
    path: PathBuf,
    conn: Mutex<Connection>,
    ids: Mutex<PushIdGenerator>,
    listeners: Arc<ListenerRegistry>,
    data_version: Mutex<i64>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read_error(path: &str) -> impl Fn(rusqlite::Error) -> Error + '_ {
    move |err| Error::remote_read(path, err.to_string())
}

fn write_error(path: &str) -> impl Fn(rusqlite::Error) -> Error + '_ {
    move |err| Error::remote_write(path, err.to_string())
}

impl SqliteStore {
    /// Open or create a store at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = db::open(&path)?;
        Self::from_connection(path, conn)
    }

    /// Create a private in-memory store, for tests.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(PathBuf::from(":memory:"), db::open_in_memory()?)
    }

    fn from_connection(path: PathBuf, conn: Connection) -> Result<Self> {
        let data_version = data_version(&conn)?;
        Ok(Self {
            path,
            conn: Mutex::new(conn),
            ids: Mutex::new(PushIdGenerator::new()),
            listeners: ListenerRegistry::new(),
            data_version: Mutex::new(data_version),
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.listeners.len()
    }

    /// Notify subscribers of writes committed by other connections.
    ///
    /// Returns `true` if the database changed since the last check.
    ///
    /// # Errors
    ///
    /// Returns a read error if the database cannot be read.
    pub fn refresh(&self) -> Result<bool> {
        let conn = lock(&self.conn);
        let version = data_version(&conn)?;
        {
            let mut last = lock(&self.data_version);
            if *last == version {
                return Ok(false);
            }
            *last = version;
        }
        let root = load_tree(&conn).map_err(read_error(""))?;
        trace!(version, "external change detected");
        let _dispatch = self.listeners.lock_dispatch();
        let pending = self.listeners.pending(&root, &[Vec::new()]);
        drop(conn);
        for delivery in pending {
            delivery.deliver();
        }
        Ok(true)
    }

    fn apply(&self, path: &str, writes: Vec<Write>) -> Result<()> {
        let mut conn = lock(&self.conn);
        let tx = conn.transaction().map_err(write_error(path))?;
        let mut root = load_tree(&tx).map_err(write_error(path))?;

        let replaces_root = writes.iter().any(|w| w.path.is_empty());
        let mut touched: BTreeSet<String> = writes
            .iter()
            .filter_map(|w| w.path.first().cloned())
            .collect();
        if replaces_root {
            touched.extend(top_level_keys(&root));
        }

        let changed: Vec<Vec<String>> = writes.iter().map(|w| w.path.clone()).collect();
        for write in writes {
            tree::set(&mut root, &write.path, write.value);
        }
        if replaces_root {
            touched.extend(top_level_keys(&root));
        }

        let now = now_ms();
        for key in &touched {
            match root.get(key) {
                Some(value) => {
                    let json = serde_json::to_string(value)?;
                    tx.execute(
                        r"
                        INSERT INTO nodes (key, value, updated_at) VALUES (?1, ?2, ?3)
                        ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                                                       updated_at = excluded.updated_at
                        ",
                        params![key, json, now],
                    )
                    .map_err(write_error(path))?;
                }
                None => {
                    tx.execute("DELETE FROM nodes WHERE key = ?1", [key])
                        .map_err(write_error(path))?;
                }
            }
        }
        tx.commit().map_err(write_error(path))?;
        trace!(path, rows = touched.len(), "write committed");

        let _dispatch = self.listeners.lock_dispatch();
        let pending = self.listeners.pending(&root, &changed);
        drop(conn);
        for delivery in pending {
            delivery.deliver();
        }
        Ok(())
    }
}

fn data_version(conn: &Connection) -> Result<i64> {
    conn.query_row("PRAGMA data_version", [], |row| row.get(0))
        .map_err(read_error("PRAGMA data_version"))
}

fn top_level_keys(root: &Value) -> Vec<String> {
    root.as_object()
        .map(|map| map.keys().cloned().collect())
        .unwrap_or_default()
}

fn parse_row(key: &str, json: &str) -> rusqlite::Result<Value> {
    serde_json::from_str(json).map_err(|err| {
        rusqlite::Error::FromSqlConversionFailure(
            1,
            rusqlite::types::Type::Text,
            format!("node '{key}' holds invalid JSON: {err}").into(),
        )
    })
}

/// Load the whole tree.
fn load_tree(conn: &Connection) -> rusqlite::Result<Value> {
    let mut stmt = conn.prepare("SELECT key, value FROM nodes")?;
    let rows = stmt.query_map([], |row| {
        let key: String = row.get(0)?;
        let json: String = row.get(1)?;
        Ok((key, json))
    })?;
    let mut map = Map::new();
    for row in rows {
        let (key, json) = row?;
        let value = parse_row(&key, &json)?;
        map.insert(key, value);
    }
    Ok(if map.is_empty() {
        Value::Null
    } else {
        Value::Object(map)
    })
}

/// Load the value at a path, reading only the row it lives in.
fn load_path(conn: &Connection, path: &[String]) -> rusqlite::Result<Option<Value>> {
    let Some((key, rest)) = path.split_first() else {
        let root = load_tree(conn)?;
        return Ok(tree::get(&root, &[]).cloned());
    };
    let json: Option<String> = conn
        .query_row("SELECT value FROM nodes WHERE key = ?1", [key], |row| {
            row.get(0)
        })
        .optional()?;
    let Some(json) = json else {
        return Ok(None);
    };
    let value = parse_row(key, &json)?;
    Ok(tree::get(&value, rest).cloned())
}

#[async_trait]
impl RealtimeStore for SqliteStore {
    async fn subscribe(&self, path: &str, on_change: ChangeCallback) -> Result<Subscription> {
        let segments = tree::segments(path);
        let conn = lock(&self.conn);
        let current = load_path(&conn, &segments).map_err(read_error(path))?;
        let _dispatch = self.listeners.lock_dispatch();
        let (subscription, initial) = self.listeners.register(segments, on_change, current);
        drop(conn);
        initial.deliver();
        debug!(path, "subscribed");
        Ok(subscription)
    }

    async fn get(&self, path: &str) -> Result<Option<Value>> {
        let segments = tree::segments(path);
        let conn = lock(&self.conn);
        load_path(&conn, &segments).map_err(read_error(path))
    }

    async fn set(&self, path: &str, value: Value) -> Result<()> {
        let write = Write::single(path, value, now_ms())?;
        self.apply(path, vec![write])
    }

    async fn push(&self, path: &str, value: Value) -> Result<String> {
        let now = now_ms();
        let key = lock(&self.ids).next_id(now);
        let write = Write::single(&format!("{path}/{key}"), value, now)?;
        self.apply(path, vec![write])?;
        debug!(path, key, "pushed");
        Ok(key)
    }

    async fn update(&self, path: &str, updates: Map<String, Value>) -> Result<()> {
        let writes = Write::batch(path, updates, now_ms())?;
        debug!(path, paths = writes.len(), "applying update");
        self.apply(path, writes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn create_test_store() -> SqliteStore {
        SqliteStore::open_in_memory().expect("failed to create test store")
    }

    fn temp_db_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "kursadmin-store-{name}-{}-{}.db",
            std::process::id(),
            chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
        ))
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let store = create_test_store();
        store
            .set("licenseFees", json!({"B": 100, "A1": 200}))
            .await
            .unwrap();
        assert_eq!(store.get("licenseFees/A1").await.unwrap(), Some(json!(200)));
        assert_eq!(store.get("schools").await.unwrap(), None);
        assert_eq!(
            store.get("").await.unwrap(),
            Some(json!({"licenseFees": {"B": 100, "A1": 200}}))
        );
    }

    #[tokio::test]
    async fn test_multi_path_update() {
        let store = create_test_store();
        store.set("schools/a/name", json!("A")).await.unwrap();
        store.set("schools/b/name", json!("B")).await.unwrap();

        let mut updates = Map::new();
        updates.insert("a/candidates".to_string(), json!({"B": 0}));
        updates.insert("b/candidates".to_string(), json!({"B": 0}));
        store.update("schools", updates).await.unwrap();

        let schools = store.get("schools").await.unwrap().unwrap();
        assert_eq!(schools["a"], json!({"name": "A", "candidates": {"B": 0}}));
        assert_eq!(schools["b"], json!({"name": "B", "candidates": {"B": 0}}));
    }

    #[tokio::test]
    async fn test_delete_removes_row() {
        let store = create_test_store();
        store.set("licenseFees/B", json!(1)).await.unwrap();
        store.set("licenseFees/B", Value::Null).await.unwrap();
        let count: i64 = lock(&store.conn)
            .query_row("SELECT COUNT(*) FROM nodes", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_root_replacement() {
        let store = create_test_store();
        store.set("schools/a/name", json!("A")).await.unwrap();
        store.set("", json!({"licenseFees": {"B": 5}})).await.unwrap();
        assert_eq!(store.get("schools").await.unwrap(), None);
        assert_eq!(store.get("licenseFees/B").await.unwrap(), Some(json!(5)));
    }

    #[tokio::test]
    async fn test_subscription_sees_writes() {
        let store = create_test_store();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _sub = store
            .subscribe(
                "licenseFees",
                Box::new(move |value: Option<&Value>| sink.lock().unwrap().push(value.cloned())),
            )
            .await
            .unwrap();
        let mut updates = Map::new();
        updates.insert("B".to_string(), json!(150));
        store.update("licenseFees", updates).await.unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![None, Some(json!({"B": 150}))]);
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let path = temp_db_path("reopen");
        {
            let store = SqliteStore::open(&path).unwrap();
            let key = store
                .push("announcements", json!({"content": "Toplantı"}))
                .await
                .unwrap();
            assert_eq!(key.len(), 20);
        }
        let store = SqliteStore::open(&path).unwrap();
        let announcements = store.get("announcements").await.unwrap().unwrap();
        assert_eq!(announcements.as_object().unwrap().len(), 1);
        drop(store);
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_refresh_sees_other_connection() {
        let path = temp_db_path("refresh");
        let watcher = SqliteStore::open(&path).unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _sub = watcher
            .subscribe(
                "licenseFees",
                Box::new(move |value: Option<&Value>| sink.lock().unwrap().push(value.cloned())),
            )
            .await
            .unwrap();
        assert!(!watcher.refresh().unwrap());

        let writer = SqliteStore::open(&path).unwrap();
        writer.set("licenseFees/B", json!(300)).await.unwrap();

        assert!(watcher.refresh().unwrap());
        assert_eq!(*seen.lock().unwrap(), vec![None, Some(json!({"B": 300}))]);
        drop(watcher);
        drop(writer);
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_invalid_path_is_rejected() {
        let store = create_test_store();
        let err = store.set("schools/a.b", json!(1)).await.unwrap_err();
        assert!(matches!(err, Error::RemoteWrite { .. }));
    }
}
