//! Error types for kursadmin.
//!
//! This module defines all error types used throughout the kursadmin crate,
//! from form validation through store, auth and decoding failures to the
//! ambient configuration and database errors.

use std::path::PathBuf;
use thiserror::Error;

/// Reason an authentication call was rejected.
///
/// The display form mirrors the error codes hosted identity providers
/// report, so messages shown to the administrator stay recognizable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthErrorKind {
    /// The email address is malformed.
    InvalidEmail,
    /// An identity already exists for the email address.
    EmailAlreadyInUse,
    /// The password does not satisfy the password policy.
    WeakPassword,
    /// The supplied password does not match.
    WrongPassword,
    /// No identity exists for the email address.
    UserNotFound,
    /// There is no signed-in session.
    NoSession,
    /// The session is no longer valid.
    SessionExpired,
    /// The credential belongs to a different account than the session.
    UserMismatch,
}

impl std::fmt::Display for AuthErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidEmail => write!(f, "auth/invalid-email"),
            Self::EmailAlreadyInUse => write!(f, "auth/email-already-in-use"),
            Self::WeakPassword => write!(f, "auth/weak-password"),
            Self::WrongPassword => write!(f, "auth/wrong-password"),
            Self::UserNotFound => write!(f, "auth/user-not-found"),
            Self::NoSession => write!(f, "auth/no-current-user"),
            Self::SessionExpired => write!(f, "auth/user-token-expired"),
            Self::UserMismatch => write!(f, "auth/user-mismatch"),
        }
    }
}

/// The main error type for kursadmin operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Panel Errors ===
    /// A required form field is blank or out of range.
    ///
    /// Raised before any remote call is made.
    #[error("invalid {field}: {message}")]
    Validation {
        /// Name of the offending field.
        field: &'static str,
        /// Description of the problem.
        message: String,
    },

    /// The selected school is not in the loaded read-model.
    #[error("school not found: {id}")]
    SchoolNotFound {
        /// The school id that was selected.
        id: String,
    },

    // === Store Errors ===
    /// The store rejected or failed a write.
    #[error("write to '{path}' failed: {message}")]
    RemoteWrite {
        /// Store path that was written.
        path: String,
        /// Description of what went wrong.
        message: String,
    },

    /// The store rejected or failed a read.
    #[error("read of '{path}' failed: {message}")]
    RemoteRead {
        /// Store path that was read.
        path: String,
        /// Description of what went wrong.
        message: String,
    },

    /// A snapshot did not match the expected record shape.
    #[error("malformed data at '{path}': {message}")]
    Decode {
        /// Store path of the malformed value.
        path: String,
        /// Description of the mismatch.
        message: String,
    },

    // === Auth Errors ===
    /// The authentication service rejected a request.
    #[error("{message} ({kind})")]
    Auth {
        /// Machine-readable reason.
        kind: AuthErrorKind,
        /// Human-readable description.
        message: String,
    },

    // === Database Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for kursadmin operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a validation error for a form field.
    #[must_use]
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Create a remote write error.
    #[must_use]
    pub fn remote_write(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RemoteWrite {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a remote read error.
    #[must_use]
    pub fn remote_read(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RemoteRead {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a decode error.
    #[must_use]
    pub fn decode(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an authentication error.
    #[must_use]
    pub fn auth(kind: AuthErrorKind, message: impl Into<String>) -> Self {
        Self::Auth {
            kind,
            message: message.into(),
        }
    }

    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this error was raised by local form validation.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Check if this error came from the authentication service.
    #[must_use]
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth { .. })
    }

    /// The auth rejection reason, if this is an auth error.
    #[must_use]
    pub fn auth_kind(&self) -> Option<AuthErrorKind> {
        match self {
            Self::Auth { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}
