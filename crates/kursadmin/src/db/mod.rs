//! `SQLite` connection setup shared by the persistent store and the local
//! auth service.

pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};

use rusqlite::Connection;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Open or create the database at `path` and bring its schema up to date.
///
/// Creates parent directories as needed.
///
/// # Errors
///
/// Returns an error if the directory or database cannot be created, or
/// schema initialization fails.
pub fn open(path: impl AsRef<Path>) -> Result<Connection> {
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }

    debug!("Opening database at {}", path.display());
    let mut conn = Connection::open(path).map_err(|source| Error::DatabaseOpen {
        path: path.to_path_buf(),
        source,
    })?;

    // WAL lets the store and auth connections share the file.
    conn.execute_batch(
        "PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL; PRAGMA busy_timeout=5000;",
    )?;
    migrations::initialize_schema(&mut conn)?;

    info!("Database opened at {}", path.display());
    Ok(conn)
}

/// Open a private in-memory database with the current schema.
///
/// # Errors
///
/// Returns an error if the database cannot be created.
pub fn open_in_memory() -> Result<Connection> {
    let mut conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
        path: PathBuf::from(":memory:"),
        source,
    })?;
    migrations::initialize_schema(&mut conn)?;
    Ok(conn)
}
