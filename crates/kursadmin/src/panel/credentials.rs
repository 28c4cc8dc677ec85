//! Credential rotator.

use tracing::{debug, error, info};

use super::{require, AdminPanel, CredentialForm, CredentialRotationMode, Outcome};
use crate::error::{AuthErrorKind, Error};
use crate::messages::{Message, Task};
use crate::notify::Notification;

impl AdminPanel {
    /// Re-authenticate the signed-in administrator and set a new password.
    ///
    /// The selected school must be in the loaded read-model. Which account
    /// receives the new password depends on
    /// [`PanelSettings::credential_rotation`](super::PanelSettings). On
    /// success all three fields are cleared.
    pub async fn submit_credential_change(&mut self) -> Outcome {
        let form = &self.credentials;
        let checks = [
            require("school", &form.school_id),
            require("new password", &form.new_password),
            require("admin password", &form.admin_password),
        ];
        if let Some(err) = checks.into_iter().find_map(Result::err) {
            return Self::invalid(Task::RotateCredential, err);
        }

        let Some(school) = self.school(&form.school_id) else {
            error!(id = %form.school_id, "selected school is not loaded");
            let err = Error::SchoolNotFound {
                id: form.school_id.clone(),
            };
            self.notify_error(&Message::SchoolNotFound);
            return Outcome::Failed(err);
        };

        let Some(session) = self.auth.current_session() else {
            error!("no administrator session");
            self.notify_error(&Message::NoAdminSession);
            return Outcome::Failed(Error::auth(
                AuthErrorKind::NoSession,
                "No user is currently signed in.",
            ));
        };

        let mode = self.settings.credential_rotation;
        debug!(school = %school.id, ?mode, "rotating credentials");

        let credential = self.auth.credential(&session.email, &form.admin_password);
        if let Err(err) = self.auth.reauthenticate(&session, &credential).await {
            return self.fail(Task::RotateCredential, err);
        }

        let result = match mode {
            CredentialRotationMode::TargetSchool => {
                self.auth
                    .admin_update_password(&school.email, &form.new_password)
                    .await
            }
            CredentialRotationMode::SignedInAccount => {
                self.auth
                    .update_password(&session, &form.new_password)
                    .await
            }
        };
        match result {
            Ok(()) => {
                info!(school = %school.id, ?mode, "password changed");
                self.credentials = CredentialForm::default();
                self.succeed(&Message::PasswordChanged)
            }
            Err(err) => self.fail(Task::RotateCredential, err),
        }
    }

    fn notify_error(&self, message: &Message<'_>) {
        self.notify(Notification::error(self.settings.locale.render(message)));
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::super::testing::*;
    use super::super::{CredentialForm, PanelSettings};
    use super::*;
    use crate::auth::AuthService;
    use crate::messages::Locale;
    use crate::store::{MemoryStore, RealtimeStore};

    const SCHOOL_EMAIL: &str = "yildiz@kurs.com";
    const SCHOOL_PASSWORD: &str = "ilksifre1";

    async fn fixture(mode: CredentialRotationMode) -> Fixture<MemoryStore> {
        let store = MemoryStore::with_root(json!({
            "schools": {
                "s1": {"name": "Yıldız", "email": SCHOOL_EMAIL, "candidates": zeroed_candidates()}
            }
        }));
        let settings = PanelSettings {
            locale: Locale::Tr,
            credential_rotation: mode,
        };
        let fx = Fixture::with_settings(store, settings).await;
        fx.auth
            .create_identity(SCHOOL_EMAIL, SCHOOL_PASSWORD)
            .await
            .unwrap();
        fx
    }

    fn fill(form: &mut CredentialForm) {
        form.school_id = "s1".to_string();
        form.new_password = "yenisifre1".to_string();
        form.admin_password = ADMIN_PASSWORD.to_string();
    }

    #[tokio::test]
    async fn test_rotation_updates_selected_school() {
        let mut fx = fixture(CredentialRotationMode::TargetSchool).await;
        fill(&mut fx.panel.credentials);

        assert!(fx.panel.submit_credential_change().await.is_completed());

        assert!(fx.auth.sign_in(SCHOOL_EMAIL, "yenisifre1").await.is_ok());
        assert!(fx.auth.sign_in(ADMIN_EMAIL, ADMIN_PASSWORD).await.is_ok());
        assert_eq!(fx.panel.credentials, CredentialForm::default());
        assert_eq!(
            fx.only_message(),
            "Sürücü kursu şifresi başarıyla değiştirildi."
        );
    }

    #[tokio::test]
    async fn test_signed_in_account_mode_updates_admin() {
        let mut fx = fixture(CredentialRotationMode::SignedInAccount).await;
        fill(&mut fx.panel.credentials);

        assert!(fx.panel.submit_credential_change().await.is_completed());

        assert!(fx.auth.sign_in(SCHOOL_EMAIL, SCHOOL_PASSWORD).await.is_ok());
        assert!(fx.auth.sign_in(ADMIN_EMAIL, "yenisifre1").await.is_ok());
    }

    #[tokio::test]
    async fn test_wrong_admin_password_keeps_inputs() {
        let mut fx = fixture(CredentialRotationMode::TargetSchool).await;
        fill(&mut fx.panel.credentials);
        fx.panel.credentials.admin_password = "yanlis123".to_string();

        let outcome = fx.panel.submit_credential_change().await;
        assert_eq!(
            outcome.error().unwrap().auth_kind(),
            Some(AuthErrorKind::WrongPassword)
        );
        assert_eq!(fx.panel.credentials.new_password, "yenisifre1");
        assert!(fx.auth.sign_in(SCHOOL_EMAIL, SCHOOL_PASSWORD).await.is_ok());
        assert!(fx
            .only_message()
            .starts_with("Şifre değiştirirken bir hata oluştu: "));
    }

    #[tokio::test]
    async fn test_weak_new_password_is_reported() {
        let mut fx = fixture(CredentialRotationMode::TargetSchool).await;
        fill(&mut fx.panel.credentials);
        fx.panel.credentials.new_password = "kisa".to_string();

        let outcome = fx.panel.submit_credential_change().await;
        assert_eq!(
            outcome.error().unwrap().auth_kind(),
            Some(AuthErrorKind::WeakPassword)
        );
        assert!(fx.only_message().contains("auth/weak-password"));
    }

    #[tokio::test]
    async fn test_unknown_school_is_reported() {
        let mut fx = fixture(CredentialRotationMode::TargetSchool).await;
        fill(&mut fx.panel.credentials);
        fx.panel.credentials.school_id = "missing".to_string();

        let outcome = fx.panel.submit_credential_change().await;
        assert!(matches!(
            outcome.error(),
            Some(Error::SchoolNotFound { id }) if id == "missing"
        ));
        assert_eq!(fx.only_message(), "Seçilen okul bulunamadı.");
    }

    #[tokio::test]
    async fn test_missing_session_is_reported() {
        let mut fx = fixture(CredentialRotationMode::TargetSchool).await;
        fx.auth.sign_out();
        fill(&mut fx.panel.credentials);

        let outcome = fx.panel.submit_credential_change().await;
        assert_eq!(
            outcome.error().unwrap().auth_kind(),
            Some(AuthErrorKind::NoSession)
        );
        assert_eq!(fx.only_message(), "Yönetici oturumu bulunamadı.");
    }

    #[tokio::test]
    async fn test_school_without_identity_is_reported() {
        let mut fx = fixture(CredentialRotationMode::TargetSchool).await;
        fx.store
            .set(
                "schools/s2",
                json!({"name": "Eski", "email": "eski@kurs.com", "candidates": zeroed_candidates()}),
            )
            .await
            .unwrap();
        fill(&mut fx.panel.credentials);
        fx.panel.credentials.school_id = "s2".to_string();

        let outcome = fx.panel.submit_credential_change().await;
        assert_eq!(
            outcome.error().unwrap().auth_kind(),
            Some(AuthErrorKind::UserNotFound)
        );
    }

    #[tokio::test]
    async fn test_blank_selection_is_rejected() {
        let mut fx = fixture(CredentialRotationMode::TargetSchool).await;
        fill(&mut fx.panel.credentials);
        fx.panel.credentials.school_id.clear();

        let outcome = fx.panel.submit_credential_change().await;
        assert!(outcome.error().unwrap().is_validation());
        assert!(fx.notifier.notifications().is_empty());
    }
}
