//! Authentication service abstraction.
//!
//! The panel provisions school identities and rotates passwords through
//! [`AuthService`]. [`LocalAuth`] is the `SQLite`-backed implementation used
//! by the CLI and tests.

mod local;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AuthErrorKind, Error, Result};

pub use local::LocalAuth;

/// Default minimum password length.
pub const DEFAULT_MIN_PASSWORD_LENGTH: usize = 6;

/// A registered identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Stable account id assigned at creation.
    pub uid: String,
    /// Login email.
    pub email: String,
    /// When the identity was created.
    pub created_at: DateTime<Utc>,
}

/// A signed-in session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Account id of the signed-in identity.
    pub uid: String,
    /// Email of the signed-in identity.
    pub email: String,
    /// When the session was established.
    pub signed_in_at: DateTime<Utc>,
}

/// An email/password pair used to re-authenticate a session.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    email: String,
    password: String,
}

impl Credential {
    /// Create a credential.
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    /// The email this credential is for.
    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    pub(crate) fn password(&self) -> &str {
        &self.password
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Rules a new password must satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordPolicy {
    /// Minimum number of characters.
    pub min_length: usize,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: DEFAULT_MIN_PASSWORD_LENGTH,
        }
    }
}

impl PasswordPolicy {
    /// Check a candidate password.
    ///
    /// # Errors
    ///
    /// Returns a weak-password auth error if the password is too short.
    pub fn check(&self, password: &str) -> Result<()> {
        if password.chars().count() < self.min_length {
            return Err(Error::auth(
                AuthErrorKind::WeakPassword,
                format!(
                    "Password should be at least {} characters",
                    self.min_length
                ),
            ));
        }
        Ok(())
    }
}

/// An identity provider.
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Register a new email/password identity.
    ///
    /// Does not change the current session.
    ///
    /// # Errors
    ///
    /// Fails with an invalid-email, email-in-use or weak-password auth error.
    async fn create_identity(&self, email: &str, password: &str) -> Result<Identity>;

    /// Sign in and make the resulting session current.
    ///
    /// # Errors
    ///
    /// Fails with a user-not-found or wrong-password auth error.
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session>;

    /// The current session, if any.
    fn current_session(&self) -> Option<Session>;

    /// Build a credential for [`AuthService::reauthenticate`].
    fn credential(&self, email: &str, password: &str) -> Credential {
        Credential::new(email, password)
    }

    /// Confirm that the session holder knows the account password.
    ///
    /// # Errors
    ///
    /// Fails if the session is stale, the credential is for another account
    /// or the password does not match.
    async fn reauthenticate(&self, session: &Session, credential: &Credential) -> Result<()>;

    /// Change the password of the session's own account.
    ///
    /// # Errors
    ///
    /// Fails if the session is stale or the password is too weak.
    async fn update_password(&self, session: &Session, new_password: &str) -> Result<()>;

    /// Change the password of any account, identified by email.
    ///
    /// # Errors
    ///
    /// Fails if no identity has the email or the password is too weak.
    async fn admin_update_password(&self, email: &str, new_password: &str) -> Result<()>;
}
