//! Webhook subscription model

use std::collections::BTreeSet;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::MessageStatus;

/// A registered status-change subscriber
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub id: String,
    pub url: String,
    pub enabled: bool,
    /// Statuses this subscriber wants to hear about
    pub events: BTreeSet<MessageStatus>,
    /// HMAC key; absent or empty means payloads go out unsigned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl WebhookConfig {
    /// Create an enabled subscription with a freshly assigned id
    pub fn new(
        url: impl Into<String>,
        events: impl IntoIterator<Item = MessageStatus>,
        secret: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: format!("wh_{}", now.timestamp_nanos_opt().unwrap_or_default()),
            url: url.into(),
            enabled: true,
            events: events.into_iter().collect(),
            secret,
            created_at: now.timestamp(),
            updated_at: now.timestamp(),
        }
    }

    /// Same as [`WebhookConfig::new`] with a caller-chosen id
    pub fn with_id(
        id: impl Into<String>,
        url: impl Into<String>,
        events: impl IntoIterator<Item = MessageStatus>,
    ) -> Self {
        Self {
            id: id.into(),
            ..Self::new(url, events, None)
        }
    }

    pub fn is_subscribed(&self, status: MessageStatus) -> bool {
        self.events.contains(&status)
    }

    /// Secret to sign with, if any
    pub fn signing_secret(&self) -> Option<&str> {
        self.secret.as_deref().filter(|s| !s.is_empty())
    }

    /// Flip `enabled` and record the modification time
    pub fn toggle(&mut self) {
        self.enabled = !self.enabled;
        self.touch();
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now().timestamp();
    }
}
