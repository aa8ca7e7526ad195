//! Status-change events and the dispatcher seam

use crate::models::{Message, MessageId, MessageStatus};

/// A message moved into a new status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub message_id: MessageId,
    pub recipient: String,
    pub sender: String,
    pub subject: String,
    pub status: MessageStatus,
    pub reason: Option<String>,
}

impl StatusChange {
    pub fn from_message(message: &Message) -> Self {
        Self {
            message_id: message.id.clone(),
            recipient: message.to.clone(),
            sender: message.from.clone(),
            subject: message.subject.clone(),
            status: message.status,
            reason: message.reason.clone(),
        }
    }
}

/// Receives status changes after they are persisted
///
/// Implementations must return promptly and must not fail: delivery work
/// happens elsewhere and its errors stay there.
pub trait EventDispatcher: Send + Sync {
    fn dispatch(&self, change: StatusChange);
}

/// Drops every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopDispatcher;

impl EventDispatcher for NoopDispatcher {
    fn dispatch(&self, _change: StatusChange) {}
}
