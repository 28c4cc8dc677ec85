//! The administration panel.
//!
//! [`AdminPanel`] keeps live read-models of the schools collection and the
//! license fee table, holds the input state of its five task widgets, and
//! turns each submission into one remote write followed by one
//! notification. The widgets live in their own modules:
//!
//! - `announcements`: the announcement composer
//! - `schools`: the school provisioner
//! - `credentials`: the credential rotator
//! - `fees`: the fee table editor
//! - `reset`: the global candidate counter reset

mod announcements;
mod credentials;
mod fees;
mod reset;
mod schools;

#[cfg(test)]
pub(crate) mod testing;

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::auth::AuthService;
use crate::decode::{decode_fee_table, decode_school_summaries};
use crate::error::{Error, Result};
use crate::messages::{Locale, Message, Task};
use crate::model::{AnnouncementType, LicenseFeeTable, SchoolSummary};
use crate::notify::{Notification, Notifier};
use crate::store::{RealtimeStore, Subscription, LICENSE_FEES_PATH, SCHOOLS_PATH};

pub use reset::Confirm;

/// Whose password the credential rotator changes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialRotationMode {
    /// The identity registered under the selected school's email.
    #[default]
    TargetSchool,
    /// The signed-in administrator's own account.
    SignedInAccount,
}

/// Panel behavior settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PanelSettings {
    /// Language of notifications and prompts.
    pub locale: Locale,
    /// Whose password the credential rotator changes.
    pub credential_rotation: CredentialRotationMode,
}

/// Local copies of the live collections.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadModels {
    /// Schools keyed by id.
    pub schools: BTreeMap<String, SchoolSummary>,
    /// The license fee table.
    pub license_fees: LicenseFeeTable,
}

/// How a submission ended.
#[derive(Debug)]
#[must_use]
pub enum Outcome {
    /// The remote write was acknowledged and a success notification shown.
    Completed,
    /// Input was rejected locally; nothing was sent or shown.
    Invalid(Error),
    /// The administrator declined the confirmation prompt.
    Declined,
    /// A remote step failed and an error notification was shown.
    Failed(Error),
}

impl Outcome {
    /// Check if the submission completed.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// The error, if the submission was invalid or failed.
    #[must_use]
    pub fn error(&self) -> Option<&Error> {
        match self {
            Self::Invalid(err) | Self::Failed(err) => Some(err),
            Self::Completed | Self::Declined => None,
        }
    }

    /// Convert into a `Result`, treating a declined prompt as success.
    ///
    /// # Errors
    ///
    /// Returns the error of an invalid or failed submission.
    pub fn into_result(self) -> Result<()> {
        match self {
            Self::Invalid(err) | Self::Failed(err) => Err(err),
            Self::Completed | Self::Declined => Ok(()),
        }
    }
}

/// Input state of the announcement composer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnouncementForm {
    /// Announcement text.
    pub content: String,
    /// Announcement category.
    pub kind: AnnouncementType,
}

/// Input state of the school provisioner.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchoolForm {
    /// School name.
    pub name: String,
    /// Login email for the new identity.
    pub email: String,
    /// Initial password.
    pub password: String,
}

/// Input state of the credential rotator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialForm {
    /// Id of the selected school.
    pub school_id: String,
    /// Password to set.
    pub new_password: String,
    /// The signed-in administrator's current password.
    pub admin_password: String,
}

fn read(models: &RwLock<ReadModels>) -> RwLockReadGuard<'_, ReadModels> {
    models.read().unwrap_or_else(PoisonError::into_inner)
}

fn write(models: &RwLock<ReadModels>) -> RwLockWriteGuard<'_, ReadModels> {
    models.write().unwrap_or_else(PoisonError::into_inner)
}

/// Reject a blank form field.
fn require(field: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::validation(field, "must not be blank"));
    }
    Ok(())
}

/// The administration panel component.
pub struct AdminPanel {
    store: Arc<dyn RealtimeStore>,
    auth: Arc<dyn AuthService>,
    notifier: Arc<dyn Notifier>,
    settings: PanelSettings,
    models: Arc<RwLock<ReadModels>>,
    subscriptions: Vec<Subscription>,
    /// Announcement composer input.
    pub announcement: AnnouncementForm,
    /// School provisioner input.
    pub school: SchoolForm,
    /// Credential rotator input.
    pub credentials: CredentialForm,
}

impl std::fmt::Debug for AdminPanel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminPanel")
            .field("settings", &self.settings)
            .field("mounted", &self.is_mounted())
            .field("announcement", &self.announcement)
            .field("school", &self.school.name)
            .field("credentials", &self.credentials.school_id)
            .finish_non_exhaustive()
    }
}

impl AdminPanel {
    /// Create an unmounted panel.
    #[must_use]
    pub fn new(
        store: Arc<dyn RealtimeStore>,
        auth: Arc<dyn AuthService>,
        notifier: Arc<dyn Notifier>,
        settings: PanelSettings,
    ) -> Self {
        Self {
            store,
            auth,
            notifier,
            settings,
            models: Arc::new(RwLock::new(ReadModels::default())),
            subscriptions: Vec::new(),
            announcement: AnnouncementForm::default(),
            school: SchoolForm::default(),
            credentials: CredentialForm::default(),
        }
    }

    /// Subscribe to the schools collection and the fee table.
    ///
    /// Does nothing if already mounted.
    ///
    /// # Errors
    ///
    /// Returns a read error if either subscription cannot be opened. In that
    /// case no subscription is left open.
    pub async fn mount(&mut self) -> Result<()> {
        if self.is_mounted() {
            return Ok(());
        }

        let models = Arc::clone(&self.models);
        let schools = self
            .store
            .subscribe(
                SCHOOLS_PATH,
                Box::new(move |value: Option<&Value>| {
                    let Some(value) = value else { return };
                    match decode_school_summaries(value) {
                        Ok((schools, rejected)) => {
                            for err in &rejected {
                                warn!(error = %err, "skipping malformed school");
                            }
                            debug!(count = schools.len(), "schools snapshot");
                            write(&models).schools = schools;
                        }
                        Err(err) => warn!(error = %err, "ignoring malformed schools snapshot"),
                    }
                }),
            )
            .await?;

        let models = Arc::clone(&self.models);
        let fees = self
            .store
            .subscribe(
                LICENSE_FEES_PATH,
                Box::new(move |value: Option<&Value>| {
                    let Some(value) = value else { return };
                    match decode_fee_table(value) {
                        Ok(table) => {
                            debug!(count = table.len(), "license fee snapshot");
                            write(&models).license_fees = table;
                        }
                        Err(err) => warn!(error = %err, "ignoring malformed fee snapshot"),
                    }
                }),
            )
            .await?;

        self.subscriptions = vec![schools, fees];
        info!("admin panel mounted");
        Ok(())
    }

    /// Release both subscriptions.
    ///
    /// No read-model update happens after this returns.
    pub fn unmount(&mut self) {
        if self.subscriptions.is_empty() {
            return;
        }
        for subscription in self.subscriptions.drain(..) {
            subscription.release();
        }
        info!("admin panel unmounted");
    }

    /// Check if the live subscriptions are open.
    #[must_use]
    pub fn is_mounted(&self) -> bool {
        !self.subscriptions.is_empty()
    }

    /// The panel settings.
    #[must_use]
    pub fn settings(&self) -> PanelSettings {
        self.settings
    }

    /// Loaded schools, ordered by id.
    #[must_use]
    pub fn schools(&self) -> Vec<SchoolSummary> {
        read(&self.models).schools.values().cloned().collect()
    }

    /// A loaded school by id.
    #[must_use]
    pub fn school(&self, id: &str) -> Option<SchoolSummary> {
        read(&self.models).schools.get(id).cloned()
    }

    /// The loaded license fee table.
    #[must_use]
    pub fn license_fees(&self) -> LicenseFeeTable {
        read(&self.models).license_fees.clone()
    }

    /// A copy of both read-models.
    #[must_use]
    pub fn read_models(&self) -> ReadModels {
        read(&self.models).clone()
    }

    fn notify(&self, notification: Notification) {
        self.notifier.notify(notification);
    }

    fn succeed(&self, message: &Message<'_>) -> Outcome {
        self.notify(Notification::success(self.settings.locale.render(message)));
        Outcome::Completed
    }

    fn fail(&self, task: Task, err: Error) -> Outcome {
        error!(?task, error = %err, "operation failed");
        let detail = err.to_string();
        self.notify(Notification::error(
            self.settings.locale.render(&Message::Failed(task, &detail)),
        ));
        Outcome::Failed(err)
    }

    fn invalid(task: Task, err: Error) -> Outcome {
        debug!(?task, error = %err, "input rejected");
        Outcome::Invalid(err)
    }
}
