//! Fire-and-forget webhook fan-out

use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use rayon::{ThreadPool, ThreadPoolBuilder};

use super::{DispatchError, HttpTransport, WebhookEvent, WebhookTransport, sign_payload};
use crate::events::{EventDispatcher, StatusChange};
use crate::models::WebhookConfig;
use crate::settings::DispatchSettings;
use crate::storage::WebhookStore;

const USER_AGENT: &str = concat!("gateway/", env!("CARGO_PKG_VERSION"));

/// Delivers status changes to subscribed webhooks on a worker pool
///
/// `dispatch` only queues work and returns. Every subscriber gets its own
/// task, so a slow or failing endpoint never delays the others. Failures are
/// logged and dropped once the attempts run out.
pub struct WebhookDispatcher {
    pool: Arc<ThreadPool>,
    ctx: Arc<DeliveryContext>,
}

struct DeliveryContext {
    webhooks: Arc<dyn WebhookStore>,
    transport: Arc<dyn WebhookTransport>,
    settings: DispatchSettings,
}

impl WebhookDispatcher {
    /// Dispatcher that POSTs over HTTP with the configured timeout
    pub fn new(webhooks: Arc<dyn WebhookStore>, settings: DispatchSettings) -> Result<Self> {
        let transport = Arc::new(HttpTransport::new(settings.timeout()));
        Self::with_transport(webhooks, transport, settings)
    }

    pub fn with_transport(
        webhooks: Arc<dyn WebhookStore>,
        transport: Arc<dyn WebhookTransport>,
        settings: DispatchSettings,
    ) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(settings.worker_threads.max(1))
            .thread_name(|i| format!("webhook-{}", i))
            .build()
            .context("Failed to start webhook worker pool")?;

        Ok(Self {
            pool: Arc::new(pool),
            ctx: Arc::new(DeliveryContext {
                webhooks,
                transport,
                settings,
            }),
        })
    }
}

impl EventDispatcher for WebhookDispatcher {
    fn dispatch(&self, change: StatusChange) {
        let ctx = Arc::clone(&self.ctx);
        let pool = Arc::clone(&self.pool);
        self.pool.spawn(move || ctx.fan_out(&pool, change));
    }
}

impl DeliveryContext {
    fn fan_out(self: Arc<Self>, pool: &ThreadPool, change: StatusChange) {
        let hooks = match self.webhooks.list_enabled() {
            Ok(hooks) => hooks,
            Err(e) => {
                error!("[WEBHOOK] Failed to list webhooks: {}", e);
                return;
            }
        };

        if hooks.is_empty() {
            debug!("[WEBHOOK] No webhooks registered, skipping {}", change.message_id);
            return;
        }

        let change = Arc::new(change);
        for hook in hooks {
            if !hook.is_subscribed(change.status) {
                debug!(
                    "[WEBHOOK] {} not subscribed to {}",
                    hook.id, change.status
                );
                continue;
            }

            let ctx = Arc::clone(&self);
            let change = Arc::clone(&change);
            pool.spawn(move || ctx.deliver_with_retry(&hook, &change));
        }
    }

    /// Try one subscriber until it answers 2xx or the attempts run out
    fn deliver_with_retry(&self, hook: &WebhookConfig, change: &StatusChange) {
        let max_attempts = self.settings.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            match self.attempt(hook, change) {
                Ok(()) => {
                    info!(
                        "[WEBHOOK] Delivered {} for {} to {}",
                        change.status, change.message_id, hook.id
                    );
                    return;
                }
                Err(e) => {
                    warn!(
                        "[WEBHOOK] Delivery to {} failed (attempt {}/{}): {}",
                        hook.id, attempt, max_attempts, e
                    );
                }
            }

            if attempt < max_attempts {
                thread::sleep(self.settings.backoff_after(attempt));
            }
        }

        error!(
            "[WEBHOOK] Giving up on {} for {} ({}) after {} attempts",
            hook.id, change.message_id, change.status, max_attempts
        );
    }

    fn attempt(&self, hook: &WebhookConfig, change: &StatusChange) -> Result<(), DispatchError> {
        let body = WebhookEvent::from_change(change).to_bytes()?;
        let headers = self.headers(hook, &body);

        let code = self.transport.post(&hook.url, &headers, &body)?;
        if !(200..300).contains(&code) {
            return Err(DispatchError::Status { code });
        }
        Ok(())
    }

    fn headers(&self, hook: &WebhookConfig, body: &[u8]) -> Vec<(String, String)> {
        let mut headers = vec![
            ("Content-Type".to_string(), "application/json".to_string()),
            ("User-Agent".to_string(), USER_AGENT.to_string()),
        ];
        if let Some(secret) = hook.signing_secret() {
            headers.push((
                self.settings.signature_header.clone(),
                sign_payload(secret, body),
            ));
        }
        headers
    }
}
