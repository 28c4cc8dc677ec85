//! `SQLite`-backed identity provider.
//!
//! Passwords are stored as Argon2id PHC strings, each carrying its own
//! salt. Emails are matched case-insensitively. The current session lives
//! in memory only.

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use regex::Regex;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info, warn};

use super::{AuthService, Credential, Identity, PasswordPolicy, Session};
use crate::db;
use crate::error::{AuthErrorKind, Error, Result};

const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";

struct Account {
    uid: String,
    email: String,
    password_hash: String,
    created_at: String,
}

/// Identity provider storing accounts in the `accounts` table.
#[derive(Debug)]
pub struct LocalAuth {
    conn: Mutex<Connection>,
    policy: PasswordPolicy,
    email_pattern: Regex,
    session: Mutex<Option<Session>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Hash a password for storage (Argon2id, PHC string format).
fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| Error::internal(format!("password hashing failed: {e}")))?;
    Ok(hash.to_string())
}

fn parse_time(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::internal(format!("invalid account timestamp '{value}': {e}")))
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn user_not_found() -> Error {
    Error::auth(
        AuthErrorKind::UserNotFound,
        "There is no user record corresponding to this identifier.",
    )
}

fn session_expired() -> Error {
    Error::auth(
        AuthErrorKind::SessionExpired,
        "The user's credential is no longer valid. The user must sign in again.",
    )
}

impl Account {
    fn verify(&self, password: &str) -> Result<bool> {
        let stored = PasswordHash::new(&self.password_hash)
            .map_err(|e| Error::internal(format!("corrupt password hash for {}: {e}", self.uid)))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &stored)
            .is_ok())
    }

    fn identity(&self) -> Result<Identity> {
        Ok(Identity {
            uid: self.uid.clone(),
            email: self.email.clone(),
            created_at: parse_time(&self.created_at)?,
        })
    }
}

impl LocalAuth {
    /// Open the accounts stored in the database at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(path: impl AsRef<Path>, policy: PasswordPolicy) -> Result<Self> {
        Self::from_connection(db::open(path)?, policy)
    }

    /// Create a provider with a private in-memory database, for tests.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory(policy: PasswordPolicy) -> Result<Self> {
        Self::from_connection(db::open_in_memory()?, policy)
    }

    fn from_connection(conn: Connection, policy: PasswordPolicy) -> Result<Self> {
        let email_pattern = Regex::new(EMAIL_PATTERN)
            .map_err(|e| Error::internal(format!("invalid email pattern: {e}")))?;
        Ok(Self {
            conn: Mutex::new(conn),
            policy,
            email_pattern,
            session: Mutex::new(None),
        })
    }

    /// The password policy applied to new passwords.
    #[must_use]
    pub fn policy(&self) -> PasswordPolicy {
        self.policy
    }

    /// End the current session.
    pub fn sign_out(&self) {
        if let Some(session) = lock(&self.session).take() {
            debug!(email = %session.email, "signed out");
        }
    }

    /// All registered identities, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the accounts table cannot be read.
    pub fn identities(&self) -> Result<Vec<Identity>> {
        let conn = lock(&self.conn);
        let mut stmt = conn.prepare(
            "SELECT uid, email, password_hash, created_at FROM accounts ORDER BY created_at, email",
        )?;
        let accounts = stmt
            .query_map([], Self::account_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        accounts.iter().map(Account::identity).collect()
    }

    fn check_email(&self, email: &str) -> Result<()> {
        if !self.email_pattern.is_match(email) {
            return Err(Error::auth(
                AuthErrorKind::InvalidEmail,
                "The email address is badly formatted.",
            ));
        }
        Ok(())
    }

    fn find_by_email(conn: &Connection, email: &str) -> Result<Option<Account>> {
        let account = conn
            .query_row(
                "SELECT uid, email, password_hash, created_at FROM accounts WHERE email = ?1",
                [email],
                Self::account_from_row,
            )
            .optional()?;
        Ok(account)
    }

    fn account_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Account> {
        Ok(Account {
            uid: row.get(0)?,
            email: row.get(1)?,
            password_hash: row.get(2)?,
            created_at: row.get(3)?,
        })
    }

    fn set_password(conn: &Connection, uid: &str, password: &str) -> Result<()> {
        let hash = hash_password(password)?;
        let changed = conn.execute(
            "UPDATE accounts SET password_hash = ?1, password_changed_at = ?2 WHERE uid = ?3",
            params![hash, Utc::now().to_rfc3339(), uid],
        )?;
        if changed == 0 {
            return Err(user_not_found());
        }
        Ok(())
    }

    /// Check that `session` is still the current session.
    fn ensure_current(&self, session: &Session) -> Result<()> {
        match lock(&self.session).as_ref() {
            Some(current) if current.uid == session.uid => Ok(()),
            Some(_) => Err(session_expired()),
            None => Err(Error::auth(
                AuthErrorKind::NoSession,
                "No user is currently signed in.",
            )),
        }
    }
}

#[async_trait]
impl AuthService for LocalAuth {
    async fn create_identity(&self, email: &str, password: &str) -> Result<Identity> {
        let email = normalize_email(email);
        self.check_email(&email)?;
        self.policy.check(password)?;

        let conn = lock(&self.conn);
        if Self::find_by_email(&conn, &email)?.is_some() {
            return Err(Error::auth(
                AuthErrorKind::EmailAlreadyInUse,
                "The email address is already in use by another account.",
            ));
        }

        let account = Account {
            uid: uuid::Uuid::new_v4().simple().to_string(),
            email,
            password_hash: hash_password(password)?,
            created_at: Utc::now().to_rfc3339(),
        };
        conn.execute(
            r"
            INSERT INTO accounts (uid, email, password_hash, created_at, password_changed_at)
            VALUES (?1, ?2, ?3, ?4, ?4)
            ",
            params![
                account.uid,
                account.email,
                account.password_hash,
                account.created_at
            ],
        )?;
        info!(uid = %account.uid, email = %account.email, "identity created");
        account.identity()
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let email = normalize_email(email);
        let account = {
            let conn = lock(&self.conn);
            Self::find_by_email(&conn, &email)?.ok_or_else(user_not_found)?
        };
        if !account.verify(password)? {
            warn!(%email, "sign-in rejected");
            return Err(Error::auth(
                AuthErrorKind::WrongPassword,
                "The password is invalid.",
            ));
        }
        let session = Session {
            uid: account.uid,
            email: account.email,
            signed_in_at: Utc::now(),
        };
        *lock(&self.session) = Some(session.clone());
        debug!(email = %session.email, "signed in");
        Ok(session)
    }

    fn current_session(&self) -> Option<Session> {
        lock(&self.session).clone()
    }

    async fn reauthenticate(&self, session: &Session, credential: &Credential) -> Result<()> {
        self.ensure_current(session)?;
        let email = normalize_email(credential.email());
        if email != session.email {
            return Err(Error::auth(
                AuthErrorKind::UserMismatch,
                "The supplied credentials do not correspond to the previously signed in user.",
            ));
        }
        let account = {
            let conn = lock(&self.conn);
            Self::find_by_email(&conn, &email)?.ok_or_else(user_not_found)?
        };
        if account.uid != session.uid {
            return Err(session_expired());
        }
        if !account.verify(credential.password())? {
            return Err(Error::auth(
                AuthErrorKind::WrongPassword,
                "The password is invalid.",
            ));
        }
        debug!(email = %session.email, "reauthenticated");
        Ok(())
    }

    async fn update_password(&self, session: &Session, new_password: &str) -> Result<()> {
        self.ensure_current(session)?;
        self.policy.check(new_password)?;
        let conn = lock(&self.conn);
        Self::set_password(&conn, &session.uid, new_password)?;
        info!(email = %session.email, "password updated");
        Ok(())
    }

    async fn admin_update_password(&self, email: &str, new_password: &str) -> Result<()> {
        self.policy.check(new_password)?;
        let email = normalize_email(email);
        let conn = lock(&self.conn);
        let account = Self::find_by_email(&conn, &email)?.ok_or_else(user_not_found)?;
        Self::set_password(&conn, &account.uid, new_password)?;
        info!(%email, uid = %account.uid, "password updated by administrator");
        Ok(())
    }
}
