//! Storage trait definitions

use super::{StoreError, StoreResult};
use crate::models::{Message, MessageId, MessageQuery, WebhookConfig};

/// Keyed persistence for message records
///
/// All backends share one contract:
/// - `save` is an upsert keyed by id and replaces every stored field
/// - `get` with an id returns zero or one record; an absent id is an empty
///   list, never an error
/// - listing applies the status filter, then offset, then limit, ordered by
///   `created_at` descending
/// - `close` is idempotent; other operations fail after it
pub trait MessageStore: Send + Sync {
    /// Insert or replace a message
    fn save(&self, message: &Message) -> StoreResult<()>;

    /// Retrieve messages matching the query
    fn get(&self, query: &MessageQuery) -> StoreResult<Vec<Message>>;

    /// Release backend resources
    fn close(&self) -> StoreResult<()>;

    /// Fetch a single message by id
    fn find(&self, id: &MessageId) -> StoreResult<Option<Message>> {
        Ok(self.get(&MessageQuery::by_id(id.clone()))?.into_iter().next())
    }
}

/// CRUD over webhook subscriptions
///
/// Unlike [`MessageStore::save`], `create` refuses to overwrite an existing
/// id. `get`, `update` and `delete` on an absent id fail with
/// [`StoreError::NotFound`].
pub trait WebhookStore: Send + Sync {
    fn create(&self, hook: &WebhookConfig) -> StoreResult<()>;

    fn get(&self, id: &str) -> StoreResult<WebhookConfig>;

    /// All subscriptions, newest first
    fn list(&self) -> StoreResult<Vec<WebhookConfig>>;

    /// Enabled subscriptions, newest first
    fn list_enabled(&self) -> StoreResult<Vec<WebhookConfig>> {
        Ok(self.list()?.into_iter().filter(|h| h.enabled).collect())
    }

    fn update(&self, hook: &WebhookConfig) -> StoreResult<()>;

    fn delete(&self, id: &str) -> StoreResult<()>;

    fn close(&self) -> StoreResult<()>;
}

/// Reject records whose key is empty
pub(crate) fn require_message_id(message: &Message) -> StoreResult<()> {
    if message.id.is_empty() {
        return Err(StoreError::invalid("message id is required"));
    }
    Ok(())
}

pub(crate) fn require_webhook_id(id: &str) -> StoreResult<()> {
    if id.is_empty() {
        return Err(StoreError::invalid("webhook id is required"));
    }
    Ok(())
}

/// Newest first, ties broken by id so every backend pages identically
pub(crate) fn sort_newest_first(messages: &mut [Message]) {
    messages.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
}

pub(crate) fn sort_hooks_newest_first(hooks: &mut [WebhookConfig]) {
    hooks.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
}

/// Apply status filter, offset and limit to an already sorted list
pub(crate) fn page(messages: Vec<Message>, query: &MessageQuery) -> Vec<Message> {
    messages
        .into_iter()
        .filter(|m| query.matches(m))
        .skip(query.offset)
        .take(query.effective_limit())
        .collect()
}
