//! Storage that keeps nothing, used when persistence is disabled

use super::{MessageStore, StoreResult};
use crate::models::{Message, MessageQuery};

/// Discards every save; every query comes back empty
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMessageStore;

impl NoopMessageStore {
    pub fn new() -> Self {
        Self
    }
}

impl MessageStore for NoopMessageStore {
    fn save(&self, _message: &Message) -> StoreResult<()> {
        Ok(())
    }

    fn get(&self, _query: &MessageQuery) -> StoreResult<Vec<Message>> {
        Ok(Vec::new())
    }

    fn close(&self) -> StoreResult<()> {
        Ok(())
    }
}
