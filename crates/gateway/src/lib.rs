//! Gateway crate - message persistence and status-change notifications
//!
//! This crate provides the core of a test-double mail gateway:
//! - Domain models (Message, MessageStatus, WebhookConfig)
//! - Delivery classification of transport outcomes
//! - Message stores and webhook registries (no-op, in-memory, file, SQLite)
//! - A store decorator that notifies on status transitions
//! - Signed, retried webhook delivery on a worker pool
//!
//! HTTP routing and the mail transport itself live outside this crate.

pub mod classify;
pub mod events;
pub mod models;
pub mod settings;
pub mod storage;
pub mod webhook;

pub use classify::{Classification, DeliveryOutcome, classify, classify_error};
pub use events::{EventDispatcher, NoopDispatcher, StatusChange};
pub use models::{Message, MessageBuilder, MessageId, MessageQuery, MessageStatus, WebhookConfig};
pub use settings::{DispatchSettings, GatewayConfig, StorageConfig, StorageKind};
pub use storage::{
    Backend, FileStore, InMemoryMessageStore, InMemoryWebhookStore, MessageStore,
    NoopMessageStore, NotifyingMessageStore, SqliteStore, StoreError, StoreResult, WebhookStore,
    open_backend,
};
pub use webhook::{
    DispatchError, HttpTransport, WebhookDispatcher, WebhookEvent, WebhookTransport, sign_payload,
    verify_signature,
};
