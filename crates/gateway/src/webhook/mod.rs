//! Outbound status-change notifications
//!
//! [`WebhookDispatcher`] fans a [`StatusChange`](crate::events::StatusChange)
//! out to every enabled subscription that asked for the new status. Each
//! delivery runs on a worker pool, is retried with exponential backoff, and
//! is signed with HMAC-SHA256 when the subscription has a secret.

mod dispatcher;
mod error;
mod payload;
mod signing;
mod transport;

pub use dispatcher::WebhookDispatcher;
pub use error::DispatchError;
pub use payload::WebhookEvent;
pub use signing::{sign_payload, verify_signature};
pub use transport::{HttpTransport, WebhookTransport};
