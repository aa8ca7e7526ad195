//! Message record and delivery status

use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Unique identifier for a stored message
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh id of the form `<unix-nanos>.<16 hex chars>`
    pub fn generate() -> Self {
        let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
        let suffix: [u8; 8] = rand::random();
        Self(format!("{}.{}", nanos, hex::encode(suffix)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for MessageId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Delivery status of a message, modelled on SendGrid's delivery events.
///
/// This is a classification tag, not a progression: a message may move
/// between any two statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    /// Accepted and ready for delivery
    Processed,
    /// Accepted by the receiving server
    Delivered,
    /// Receiving server could not be reached; delivery may be retried
    Deferred,
    /// Permanent rejection (hard bounce)
    Bounce,
    /// Temporary rejection (soft bounce)
    Blocked,
    /// Dropped before sending
    Dropped,
}

impl MessageStatus {
    pub const ALL: [MessageStatus; 6] = [
        MessageStatus::Processed,
        MessageStatus::Delivered,
        MessageStatus::Deferred,
        MessageStatus::Bounce,
        MessageStatus::Blocked,
        MessageStatus::Dropped,
    ];

    /// Wire tag used in payloads, files and database rows
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::Processed => "processed",
            MessageStatus::Delivered => "delivered",
            MessageStatus::Deferred => "deferred",
            MessageStatus::Bounce => "bounce",
            MessageStatus::Blocked => "blocked",
            MessageStatus::Dropped => "dropped",
        }
    }
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not one of the known status tags
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown message status: {0:?}")]
pub struct UnknownStatus(pub String);

impl FromStr for MessageStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim();
        MessageStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(tag))
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// One outbound email attempt for one recipient.
///
/// Serialized field names match the on-disk JSON layout of the
/// filesystem backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "msg_id")]
    pub id: MessageId,
    #[serde(rename = "from_email")]
    pub from: String,
    #[serde(rename = "to_email")]
    pub to: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub html_body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_body: Option<String>,
    pub status: MessageStatus,
    /// Raw diagnostic text returned by the transport
    #[serde(rename = "smtp_response", default, skip_serializing_if = "Option::is_none")]
    pub transport_response: Option<String>,
    /// Failure detail, set for non-delivered statuses
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Unix seconds of first persistence
    #[serde(rename = "timestamp")]
    pub created_at: i64,
    /// Unix seconds of the most recent status or tracking event
    #[serde(rename = "last_event_time", default)]
    pub last_event_at: i64,
    #[serde(default)]
    pub opens_count: u32,
    #[serde(default)]
    pub clicks_count: u32,
}

impl Message {
    /// Create a builder for a new message
    pub fn builder(id: impl Into<MessageId>) -> MessageBuilder {
        MessageBuilder::new(id.into())
    }

    /// Copy of this record carrying a new status and failure reason
    pub fn with_status(&self, status: MessageStatus, reason: Option<String>) -> Self {
        Self {
            status,
            reason,
            last_event_at: Utc::now().timestamp(),
            ..self.clone()
        }
    }
}

/// Builder for constructing Message instances
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    message: Message,
}

impl MessageBuilder {
    fn new(id: MessageId) -> Self {
        let now = Utc::now().timestamp();
        Self {
            message: Message {
                id,
                from: String::new(),
                to: String::new(),
                subject: String::new(),
                html_body: String::new(),
                text_body: None,
                status: MessageStatus::Processed,
                transport_response: None,
                reason: None,
                created_at: now,
                last_event_at: now,
                opens_count: 0,
                clicks_count: 0,
            },
        }
    }

    pub fn from(mut self, from: impl Into<String>) -> Self {
        self.message.from = from.into();
        self
    }

    pub fn to(mut self, to: impl Into<String>) -> Self {
        self.message.to = to.into();
        self
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.message.subject = subject.into();
        self
    }

    pub fn html_body(mut self, body: impl Into<String>) -> Self {
        self.message.html_body = body.into();
        self
    }

    pub fn text_body(mut self, body: impl Into<String>) -> Self {
        self.message.text_body = Some(body.into());
        self
    }

    pub fn status(mut self, status: MessageStatus) -> Self {
        self.message.status = status;
        self
    }

    pub fn transport_response(mut self, response: impl Into<String>) -> Self {
        self.message.transport_response = Some(response.into());
        self
    }

    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.message.reason = Some(reason.into());
        self
    }

    pub fn created_at(mut self, unix_secs: i64) -> Self {
        self.message.created_at = unix_secs;
        self
    }

    pub fn last_event_at(mut self, unix_secs: i64) -> Self {
        self.message.last_event_at = unix_secs;
        self
    }

    pub fn opens_count(mut self, count: u32) -> Self {
        self.message.opens_count = count;
        self
    }

    pub fn clicks_count(mut self, count: u32) -> Self {
        self.message.clicks_count = count;
        self
    }

    pub fn build(self) -> Message {
        self.message
    }
}

/// Default page size when a query does not set a limit
pub const DEFAULT_QUERY_LIMIT: usize = 100;

/// Filter for message retrieval
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageQuery {
    /// Exact id lookup; returns zero or one record
    pub id: Option<MessageId>,
    pub status: Option<MessageStatus>,
    /// Maximum number of results; unset or zero means [`DEFAULT_QUERY_LIMIT`]
    pub limit: Option<usize>,
    pub offset: usize,
}

impl MessageQuery {
    /// Query matching every message, newest first
    pub fn all() -> Self {
        Self::default()
    }

    pub fn by_id(id: impl Into<MessageId>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    pub fn with_status(mut self, status: MessageStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn effective_limit(&self) -> usize {
        match self.limit {
            Some(limit) if limit > 0 => limit,
            _ => DEFAULT_QUERY_LIMIT,
        }
    }

    /// Check a record against the status filter
    pub fn matches(&self, message: &Message) -> bool {
        self.status.is_none_or(|status| message.status == status)
    }
}
