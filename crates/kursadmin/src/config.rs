//! Configuration management for kursadmin.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::auth::{PasswordPolicy, DEFAULT_MIN_PASSWORD_LENGTH};
use crate::error::{Error, Result};
use crate::messages::Locale;
use crate::panel::{CredentialRotationMode, PanelSettings};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "kursadmin";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "kursadmin.db";

/// Prefix for environment overrides.
const ENV_PREFIX: &str = "KURSADMIN_";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `KURSADMIN_`, sections separated
///    by `__`, e.g. `KURSADMIN_PANEL__LOCALE=en`)
/// 2. TOML config file at `~/.config/kursadmin/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Store configuration.
    pub store: StoreConfig,
    /// Administrator account used to sign in.
    pub admin: AdminConfig,
    /// Panel behavior.
    pub panel: PanelConfig,
}

/// Store-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/kursadmin/kursadmin.db`
    pub database_path: Option<PathBuf>,
    /// How often `watch` checks for writes made by other processes.
    pub poll_interval_ms: u64,
}

/// Administrator sign-in configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Administrator email.
    pub email: Option<String>,
    /// Administrator password. Never written back out.
    #[serde(skip_serializing)]
    pub password: Option<String>,
}

/// Panel behavior configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
    /// Language of notifications and prompts.
    pub locale: Locale,
    /// Whose password the credential rotator changes.
    pub credential_rotation: CredentialRotationMode,
    /// Minimum length of new passwords.
    pub min_password_length: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: None, // Will be resolved to default at runtime
            poll_interval_ms: 500,
        }
    }
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            locale: Locale::default(),
            credential_rotation: CredentialRotationMode::default(),
            min_password_length: DEFAULT_MIN_PASSWORD_LENGTH,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading, parsing or validation
    /// fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config = Self::figment(config_path).extract::<Self>()?;
        config.validate()?;
        Ok(config)
    }

    /// The layered configuration sources, without extracting them.
    #[must_use]
    pub fn figment(config_path: Option<PathBuf>) -> Figment {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file).nested())
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.panel.min_password_length == 0 {
            return Err(Error::ConfigValidation {
                message: "min_password_length must be greater than 0".to_string(),
            });
        }

        if self.store.poll_interval_ms == 0 {
            return Err(Error::ConfigValidation {
                message: "poll_interval_ms must be greater than 0".to_string(),
            });
        }

        if let Some(email) = &self.admin.email {
            if email.trim().is_empty() {
                return Err(Error::ConfigValidation {
                    message: "admin email must not be blank".to_string(),
                });
            }
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.store
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the poll interval as a Duration.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.store.poll_interval_ms)
    }

    /// The password policy for new identities and rotated passwords.
    #[must_use]
    pub fn password_policy(&self) -> PasswordPolicy {
        PasswordPolicy {
            min_length: self.panel.min_password_length,
        }
    }

    /// Settings for the admin panel.
    #[must_use]
    pub fn panel_settings(&self) -> PanelSettings {
        PanelSettings {
            locale: self.panel.locale,
            credential_rotation: self.panel.credential_rotation,
        }
    }
}
