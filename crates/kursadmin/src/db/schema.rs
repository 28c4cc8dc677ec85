//! `SQLite` schema definitions for kursadmin.
//!
//! The document tree is stored one row per top-level key, with the subtree
//! serialized as JSON. Auth identities live in their own table.

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// SQL statement to create the document tree table.
pub const CREATE_NODES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS nodes (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at INTEGER NOT NULL
)
";

/// SQL statement to create the auth identity table.
pub const CREATE_ACCOUNTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS accounts (
    uid TEXT PRIMARY KEY,
    email TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    created_at TEXT NOT NULL,
    password_changed_at TEXT NOT NULL
)
";

/// Statements that must exist before migrations can run.
pub const BOOTSTRAP_STATEMENTS: &[&str] = &[CREATE_METADATA_TABLE];
