//! `kursadmin` - Administration panel for driving-school licensing and fees
//!
//! This library provides the panel that a central administrator uses to post
//! announcements, provision schools, rotate school passwords, edit the
//! license fee table and reset candidate counters, along with the realtime
//! store and identity provider it runs against.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod auth;
pub mod cli;
pub mod config;
pub mod db;
pub mod decode;
pub mod error;
pub mod logging;
pub mod messages;
pub mod model;
pub mod notify;
pub mod panel;
pub mod store;

pub use auth::{AuthService, Credential, Identity, LocalAuth, PasswordPolicy, Session};
pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use messages::Locale;
pub use model::{ClassCode, LicenseFeeTable, SchoolSummary};
pub use notify::{ConsoleNotifier, Notification, Notifier, TracingNotifier};
pub use panel::{AdminPanel, Confirm, CredentialRotationMode, Outcome, PanelSettings};
pub use store::{MemoryStore, RealtimeStore, SqliteStore, Subscription};
