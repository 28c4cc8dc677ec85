//! Shared fixture for panel tests.

use std::sync::Arc;

use serde_json::{json, Value};

use super::{AdminPanel, PanelSettings};
use crate::auth::{AuthService, LocalAuth, PasswordPolicy};
use crate::notify::{NotificationLevel, RecordingNotifier};
use crate::store::RealtimeStore;

pub(crate) const ADMIN_EMAIL: &str = "admin@kurs.com";
pub(crate) const ADMIN_PASSWORD: &str = "yonetici1";

/// A mounted panel over a store, a local auth service with a signed-in
/// administrator, and a recording notifier.
pub(crate) struct Fixture<S> {
    pub(crate) store: Arc<S>,
    pub(crate) auth: Arc<LocalAuth>,
    pub(crate) notifier: Arc<RecordingNotifier>,
    pub(crate) panel: AdminPanel,
}

impl<S: RealtimeStore + 'static> Fixture<S> {
    pub(crate) async fn new(store: S) -> Self {
        Self::with_settings(store, PanelSettings::default()).await
    }

    pub(crate) async fn with_settings(store: S, settings: PanelSettings) -> Self {
        let store = Arc::new(store);
        let auth = Arc::new(LocalAuth::open_in_memory(PasswordPolicy::default()).unwrap());
        auth.create_identity(ADMIN_EMAIL, ADMIN_PASSWORD)
            .await
            .unwrap();
        auth.sign_in(ADMIN_EMAIL, ADMIN_PASSWORD).await.unwrap();
        let notifier = Arc::new(RecordingNotifier::new());

        let mut panel = AdminPanel::new(
            Arc::clone(&store) as Arc<dyn RealtimeStore>,
            Arc::clone(&auth) as Arc<dyn AuthService>,
            Arc::clone(&notifier) as Arc<dyn crate::notify::Notifier>,
            settings,
        );
        panel.mount().await.unwrap();
        Self {
            store,
            auth,
            notifier,
            panel,
        }
    }

    /// Levels of the notifications shown so far.
    pub(crate) fn levels(&self) -> Vec<NotificationLevel> {
        self.notifier
            .notifications()
            .iter()
            .map(|n| n.level)
            .collect()
    }

    /// Text of the only notification shown so far.
    pub(crate) fn only_message(&self) -> String {
        let notifications = self.notifier.notifications();
        assert_eq!(notifications.len(), 1, "expected one notification");
        notifications[0].message.clone()
    }
}

pub(crate) fn zeroed_candidates() -> Value {
    json!({
        "B": 0, "A1": 0, "A2": 0, "C": 0, "D": 0,
        "FARK_A1": 0, "FARK_A2": 0, "BAKANLIK_A1": 0
    })
}

pub(crate) fn candidates(count: u32) -> Value {
    json!({
        "B": count, "A1": count, "A2": count, "C": count, "D": count,
        "FARK_A1": count, "FARK_A2": count, "BAKANLIK_A1": count
    })
}
