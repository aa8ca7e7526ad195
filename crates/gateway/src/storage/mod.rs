//! Storage traits and implementations
//!
//! Message records and webhook subscriptions sit behind two traits so the
//! gateway can run without persistence, against a directory of JSON files,
//! or against a SQLite database. Every backend passes the same behavioural
//! suite; see `contract.rs`.

mod error;
mod factory;
mod filesystem;
mod memory;
mod noop;
mod notifying;
mod sqlite;
mod traits;

#[cfg(test)]
mod contract;

pub use error::{StoreError, StoreResult};
pub use factory::{Backend, open_backend};
pub use filesystem::FileStore;
pub use memory::{InMemoryMessageStore, InMemoryWebhookStore};
pub use noop::NoopMessageStore;
pub use notifying::NotifyingMessageStore;
pub use sqlite::SqliteStore;
pub use traits::{MessageStore, WebhookStore};
