//! Localized notification and prompt texts.

use serde::{Deserialize, Serialize};

use crate::model::ClassCode;

/// Language used for notifications and prompts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    /// Turkish.
    #[default]
    Tr,
    /// English.
    En,
}

impl std::str::FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tr" => Ok(Self::Tr),
            "en" => Ok(Self::En),
            other => Err(format!("unsupported locale '{other}' (expected tr or en)")),
        }
    }
}

/// A panel task, used to name the failing operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    /// Posting an announcement.
    Announce,
    /// Provisioning a school.
    ProvisionSchool,
    /// Rotating a school's password.
    RotateCredential,
    /// Editing a license fee.
    UpdateFee,
    /// Resetting candidate counters.
    ResetCandidates,
}

/// Every text the panel shows.
#[derive(Debug, Clone, PartialEq)]
pub enum Message<'a> {
    /// An announcement was posted.
    AnnouncementAdded,
    /// A school was provisioned.
    SchoolAdded,
    /// The selected school is not loaded.
    SchoolNotFound,
    /// No administrator is signed in.
    NoAdminSession,
    /// A school's password was changed.
    PasswordChanged,
    /// A fee was updated.
    FeeUpdated(ClassCode),
    /// Confirmation prompt before resetting counters.
    ResetPrompt,
    /// Candidate counters were reset.
    CandidatesReset,
    /// A task failed with the given detail.
    Failed(Task, &'a str),
}

impl Locale {
    /// Render a message in this locale.
    #[must_use]
    pub fn render(self, message: &Message<'_>) -> String {
        match self {
            Self::Tr => render_tr(message),
            Self::En => render_en(message),
        }
    }
}

fn render_tr(message: &Message<'_>) -> String {
    match message {
        Message::AnnouncementAdded => "Duyuru başarıyla eklendi.".to_string(),
        Message::SchoolAdded => "Yeni sürücü kursu başarıyla eklendi.".to_string(),
        Message::SchoolNotFound => "Seçilen okul bulunamadı.".to_string(),
        Message::NoAdminSession => "Yönetici oturumu bulunamadı.".to_string(),
        Message::PasswordChanged => "Sürücü kursu şifresi başarıyla değiştirildi.".to_string(),
        Message::FeeUpdated(code) => format!("{code} sınıfı için ehliyet ücreti güncellendi."),
        Message::ResetPrompt => "Tüm adayların sayısını sıfırlamak istediğinizden emin misiniz? \
                                 Bu işlem geri alınamaz."
            .to_string(),
        Message::CandidatesReset => "Tüm adayların sayısı başarıyla sıfırlandı.".to_string(),
        Message::Failed(task, detail) => {
            let prefix = match task {
                Task::Announce => "Duyuru eklenirken bir hata oluştu",
                Task::ProvisionSchool => "Sürücü kursu eklenirken bir hata oluştu",
                Task::RotateCredential => "Şifre değiştirirken bir hata oluştu",
                Task::UpdateFee => "Ehliyet ücreti güncellenirken bir hata oluştu",
                Task::ResetCandidates => "Adaylar sıfırlanırken bir hata oluştu",
            };
            format!("{prefix}: {detail}")
        }
    }
}

fn render_en(message: &Message<'_>) -> String {
    match message {
        Message::AnnouncementAdded => "Announcement added.".to_string(),
        Message::SchoolAdded => "New driving school added.".to_string(),
        Message::SchoolNotFound => "The selected school was not found.".to_string(),
        Message::NoAdminSession => "No administrator session found.".to_string(),
        Message::PasswordChanged => "Driving school password changed.".to_string(),
        Message::FeeUpdated(code) => format!("License fee for class {code} updated."),
        Message::ResetPrompt => {
            "Reset the candidate count of every school? This cannot be undone.".to_string()
        }
        Message::CandidatesReset => "All candidate counts were reset.".to_string(),
        Message::Failed(task, detail) => {
            let prefix = match task {
                Task::Announce => "Failed to add announcement",
                Task::ProvisionSchool => "Failed to add driving school",
                Task::RotateCredential => "Failed to change password",
                Task::UpdateFee => "Failed to update license fee",
                Task::ResetCandidates => "Failed to reset candidates",
            };
            format!("{prefix}: {detail}")
        }
    }
}
