//! Wire format of a webhook notification

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::events::StatusChange;
use crate::models::MessageStatus;

/// JSON body POSTed to subscribers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookEvent {
    /// `<unix-nanos>-<message id>`
    pub event_id: String,
    pub event: MessageStatus,
    /// Unix seconds
    pub timestamp: i64,
    pub sg_message_id: String,
    pub email: String,
    pub from: String,
    pub subject: String,
    pub status: MessageStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl WebhookEvent {
    pub fn from_change(change: &StatusChange) -> Self {
        let now = Utc::now();
        Self {
            event_id: format!(
                "{}-{}",
                now.timestamp_nanos_opt().unwrap_or_default(),
                change.message_id
            ),
            event: change.status,
            timestamp: now.timestamp(),
            sg_message_id: change.message_id.to_string(),
            email: change.recipient.clone(),
            from: change.sender.clone(),
            subject: change.subject.clone(),
            status: change.status,
            reason: change.reason.clone(),
        }
    }

    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}
