//! School provisioner.
//!
//! Provisioning is two steps with no compensation: create the school's
//! auth identity, then append its record. When the second step fails the
//! identity stays behind and is logged so an operator can remove it.

use tracing::{debug, error, info};

use super::{require, AdminPanel, Outcome};
use crate::error::Error;
use crate::messages::{Message, Task};
use crate::model::SchoolRecord;
use crate::store::SCHOOLS_PATH;

impl AdminPanel {
    /// Provision the school described by the school form.
    ///
    /// Name and email are trimmed; the password is used as entered. On
    /// success all three fields are cleared.
    pub async fn submit_school(&mut self) -> Outcome {
        let form = &self.school;
        let checks = [
            require("name", &form.name),
            require("email", &form.email),
            require("password", &form.password),
        ];
        if let Some(err) = checks.into_iter().find_map(Result::err) {
            return Self::invalid(Task::ProvisionSchool, err);
        }

        let name = form.name.trim().to_string();
        let email = form.email.trim().to_string();
        debug!(%name, %email, "provisioning school");

        let identity = match self.auth.create_identity(&email, &form.password).await {
            Ok(identity) => identity,
            Err(err) => return self.fail(Task::ProvisionSchool, err),
        };

        let record = match serde_json::to_value(SchoolRecord::new(&name, &email)) {
            Ok(record) => record,
            Err(err) => return self.fail(Task::ProvisionSchool, Error::from(err)),
        };
        match self.store.push(SCHOOLS_PATH, record).await {
            Ok(id) => {
                info!(%id, uid = %identity.uid, %name, "school provisioned");
                self.school = super::SchoolForm::default();
                self.succeed(&Message::SchoolAdded)
            }
            Err(err) => {
                error!(
                    uid = %identity.uid,
                    email = %identity.email,
                    "school record was not written; auth identity left without a school"
                );
                self.fail(Task::ProvisionSchool, err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use serde_json::json;

    use super::super::testing::*;
    use super::super::SchoolForm;
    use crate::auth::AuthService;
    use crate::decode::decode_schools;
    use crate::error::AuthErrorKind;
    use crate::notify::NotificationLevel;
    use crate::store::testing::FailingStore;
    use crate::store::{MemoryStore, RealtimeStore};

    fn fill(form: &mut SchoolForm) {
        form.name = " Güven Sürücü Kursu ".to_string();
        form.email = "guven@kurs.com ".to_string();
        form.password = "baslangic1".to_string();
    }

    #[tokio::test]
    async fn test_provisioning_creates_identity_and_zeroed_school() {
        let mut fx = Fixture::new(MemoryStore::new()).await;
        fill(&mut fx.panel.school);

        assert!(fx.panel.submit_school().await.is_completed());

        let schools = fx.store.get("schools").await.unwrap().unwrap();
        let schools = decode_schools(&schools).unwrap();
        assert_eq!(schools.len(), 1);
        let school = &schools[0];
        assert_eq!(school.record.name, "Güven Sürücü Kursu");
        assert_eq!(school.record.email, "guven@kurs.com");
        assert!(school.record.candidates.is_zeroed());
        assert_eq!(school.id.len(), 20);

        assert!(fx.auth.sign_in("guven@kurs.com", "baslangic1").await.is_ok());
        assert_eq!(fx.panel.school, SchoolForm::default());
        assert_eq!(fx.only_message(), "Yeni sürücü kursu başarıyla eklendi.");
        assert_eq!(fx.panel.schools().len(), 1);
    }

    #[tokio::test]
    async fn test_provisioning_keeps_admin_session() {
        let mut fx = Fixture::new(MemoryStore::new()).await;
        fill(&mut fx.panel.school);
        assert!(fx.panel.submit_school().await.is_completed());
        assert_eq!(fx.auth.current_session().unwrap().email, ADMIN_EMAIL);
    }

    #[tokio::test]
    async fn test_blank_field_is_rejected_without_calls() {
        let mut fx = Fixture::new(FailingStore::new(MemoryStore::new())).await;
        fill(&mut fx.panel.school);
        fx.panel.school.password = " ".to_string();

        let outcome = fx.panel.submit_school().await;
        assert!(outcome.error().unwrap().is_validation());
        assert_eq!(fx.store.write_count(), 0);
        assert_eq!(fx.auth.identities().unwrap().len(), 1);
        assert!(fx.notifier.notifications().is_empty());
    }

    #[tokio::test]
    async fn test_auth_failure_writes_no_school() {
        let mut fx = Fixture::new(FailingStore::new(MemoryStore::new())).await;
        fill(&mut fx.panel.school);
        fx.panel.school.password = "123".to_string();

        let outcome = fx.panel.submit_school().await;
        assert_eq!(
            outcome.error().unwrap().auth_kind(),
            Some(AuthErrorKind::WeakPassword)
        );
        assert_eq!(fx.store.write_count(), 0);
        assert_eq!(fx.panel.school.password, "123");
        let message = fx.only_message();
        assert!(message.starts_with("Sürücü kursu eklenirken bir hata oluştu: "));
        assert!(message.contains("auth/weak-password"));
    }

    #[tokio::test]
    async fn test_duplicate_email_is_reported() {
        let mut fx = Fixture::new(MemoryStore::new()).await;
        fill(&mut fx.panel.school);
        fx.panel.school.email = ADMIN_EMAIL.to_string();

        let outcome = fx.panel.submit_school().await;
        assert_eq!(
            outcome.error().unwrap().auth_kind(),
            Some(AuthErrorKind::EmailAlreadyInUse)
        );
        assert_eq!(fx.store.get("schools").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_record_failure_leaves_identity_in_place() {
        let mut fx = Fixture::new(FailingStore::new(MemoryStore::new())).await;
        fx.store.fail_push.store(true, Ordering::SeqCst);
        fill(&mut fx.panel.school);

        let outcome = fx.panel.submit_school().await;
        assert!(matches!(outcome, super::Outcome::Failed(_)));
        assert_eq!(fx.store.inner.snapshot(), json!(null));
        let emails: Vec<_> = fx
            .auth
            .identities()
            .unwrap()
            .into_iter()
            .map(|i| i.email)
            .collect();
        assert!(emails.contains(&"guven@kurs.com".to_string()));
        assert_eq!(fx.levels(), vec![NotificationLevel::Error]);
        assert_eq!(fx.panel.school.name, " Güven Sürücü Kursu ");
    }
}
