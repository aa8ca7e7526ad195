//! Message store decorator that reports status transitions

use std::sync::{Arc, Mutex};

use log::debug;

use super::traits::require_message_id;
use super::{MessageStore, StoreError, StoreResult};
use crate::events::{EventDispatcher, StatusChange};
use crate::models::{Message, MessageQuery};

/// Wraps a store and notifies a dispatcher when a save changes a status
///
/// A save of a new id, or of an existing id with a different status,
/// dispatches once after the write succeeds. Re-saving an unchanged status
/// is silent. A failed write never dispatches.
///
/// Saves through this wrapper are serialized so the read of the prior record
/// and the write form one step; two racing first saves of an id notify once.
/// Writes that bypass the wrapper are not covered.
pub struct NotifyingMessageStore {
    inner: Arc<dyn MessageStore>,
    dispatcher: Arc<dyn EventDispatcher>,
    save_lock: Mutex<()>,
}

impl NotifyingMessageStore {
    pub fn new(inner: Arc<dyn MessageStore>, dispatcher: Arc<dyn EventDispatcher>) -> Self {
        Self {
            inner,
            dispatcher,
            save_lock: Mutex::new(()),
        }
    }

    pub fn inner(&self) -> &Arc<dyn MessageStore> {
        &self.inner
    }
}

impl MessageStore for NotifyingMessageStore {
    fn save(&self, message: &Message) -> StoreResult<()> {
        require_message_id(message)?;

        let guard = self.save_lock.lock().map_err(|_| StoreError::poisoned())?;
        let previous = self.inner.find(&message.id)?;
        self.inner.save(message)?;
        drop(guard);

        match previous {
            Some(prev) if prev.status == message.status => {
                debug!(
                    "[STORE] {} still {}, not notifying",
                    message.id, message.status
                );
            }
            _ => self.dispatcher.dispatch(StatusChange::from_message(message)),
        }
        Ok(())
    }

    fn get(&self, query: &MessageQuery) -> StoreResult<Vec<Message>> {
        self.inner.get(query)
    }

    fn close(&self) -> StoreResult<()> {
        self.inner.close()
    }
}
