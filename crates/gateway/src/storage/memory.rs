//! In-memory storage implementation
//!
//! Used by tests and when webhooks must work without a persistent backend.
//! Request handlers and dispatch workers share one store, so each map sits
//! behind an RwLock.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use super::traits::{
    page, require_message_id, require_webhook_id, sort_hooks_newest_first, sort_newest_first,
};
use super::{MessageStore, StoreError, StoreResult, WebhookStore};
use crate::models::{Message, MessageQuery, WebhookConfig};

/// In-memory implementation of MessageStore
#[derive(Default)]
pub struct InMemoryMessageStore {
    messages: RwLock<HashMap<String, Message>>,
    closed: AtomicBool,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.messages.read().map(|m| m.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::closed());
        }
        Ok(())
    }
}

impl MessageStore for InMemoryMessageStore {
    fn save(&self, message: &Message) -> StoreResult<()> {
        self.ensure_open()?;
        require_message_id(message)?;

        let mut messages = self.messages.write().map_err(|_| StoreError::poisoned())?;
        messages.insert(message.id.0.clone(), message.clone());
        Ok(())
    }

    fn get(&self, query: &MessageQuery) -> StoreResult<Vec<Message>> {
        self.ensure_open()?;
        let messages = self.messages.read().map_err(|_| StoreError::poisoned())?;

        if let Some(id) = &query.id {
            return Ok(messages.get(id.as_str()).cloned().into_iter().collect());
        }

        let mut list: Vec<Message> = messages.values().cloned().collect();
        drop(messages);

        sort_newest_first(&mut list);
        Ok(page(list, query))
    }

    fn close(&self) -> StoreResult<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

/// In-memory implementation of WebhookStore
#[derive(Default)]
pub struct InMemoryWebhookStore {
    hooks: RwLock<HashMap<String, WebhookConfig>>,
    closed: AtomicBool,
}

impl InMemoryWebhookStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::closed());
        }
        Ok(())
    }
}

impl WebhookStore for InMemoryWebhookStore {
    fn create(&self, hook: &WebhookConfig) -> StoreResult<()> {
        self.ensure_open()?;
        require_webhook_id(&hook.id)?;

        let mut hooks = self.hooks.write().map_err(|_| StoreError::poisoned())?;
        match hooks.entry(hook.id.clone()) {
            Entry::Occupied(_) => Err(StoreError::AlreadyExists {
                resource: format!("webhook {}", hook.id),
            }),
            Entry::Vacant(slot) => {
                slot.insert(hook.clone());
                Ok(())
            }
        }
    }

    fn get(&self, id: &str) -> StoreResult<WebhookConfig> {
        self.ensure_open()?;
        let hooks = self.hooks.read().map_err(|_| StoreError::poisoned())?;
        hooks
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(format!("webhook {}", id)))
    }

    fn list(&self) -> StoreResult<Vec<WebhookConfig>> {
        self.ensure_open()?;
        let hooks = self.hooks.read().map_err(|_| StoreError::poisoned())?;
        let mut list: Vec<WebhookConfig> = hooks.values().cloned().collect();
        sort_hooks_newest_first(&mut list);
        Ok(list)
    }

    fn update(&self, hook: &WebhookConfig) -> StoreResult<()> {
        self.ensure_open()?;
        let mut hooks = self.hooks.write().map_err(|_| StoreError::poisoned())?;
        match hooks.get_mut(&hook.id) {
            Some(existing) => {
                *existing = hook.clone();
                Ok(())
            }
            None => Err(StoreError::not_found(format!("webhook {}", hook.id))),
        }
    }

    fn delete(&self, id: &str) -> StoreResult<()> {
        self.ensure_open()?;
        let mut hooks = self.hooks.write().map_err(|_| StoreError::poisoned())?;
        hooks
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found(format!("webhook {}", id)))
    }

    fn close(&self) -> StoreResult<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}
