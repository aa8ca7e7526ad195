//! Domain models for the gateway

mod message;
mod webhook;

pub use message::{
    DEFAULT_QUERY_LIMIT, Message, MessageBuilder, MessageId, MessageQuery, MessageStatus,
    UnknownStatus,
};
pub use webhook::WebhookConfig;
