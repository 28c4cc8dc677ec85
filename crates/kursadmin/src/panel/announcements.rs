//! Announcement composer.

use serde_json::{Map, Value};
use tracing::{debug, info};

use super::{require, AdminPanel, Outcome};
use crate::messages::{Message, Task};
use crate::store::{server_timestamp, ANNOUNCEMENTS_PATH};

impl AdminPanel {
    /// Post the composed announcement.
    ///
    /// Content is stored as entered; it only has to be non-blank. On success
    /// the content field is cleared and the category kept.
    pub async fn submit_announcement(&mut self) -> Outcome {
        if let Err(err) = require("content", &self.announcement.content) {
            return Self::invalid(Task::Announce, err);
        }
        debug!(kind = %self.announcement.kind, "posting announcement");

        let mut payload = Map::new();
        payload.insert(
            "content".to_string(),
            Value::String(self.announcement.content.clone()),
        );
        payload.insert(
            "type".to_string(),
            Value::String(self.announcement.kind.to_string()),
        );
        payload.insert("createdAt".to_string(), server_timestamp());

        match self.store.push(ANNOUNCEMENTS_PATH, Value::Object(payload)).await {
            Ok(key) => {
                info!(%key, "announcement posted");
                self.announcement.content.clear();
                self.succeed(&Message::AnnouncementAdded)
            }
            Err(err) => self.fail(Task::Announce, err),
        }
    }
}
