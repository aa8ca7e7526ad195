//! Delivery outcome classification
//!
//! Pure functions mapping the result of a transport attempt to a
//! [`MessageStatus`]. No I/O, no retries.

use std::fmt::Display;

use crate::models::MessageStatus;

/// SMTP reply codes meaning the recipient server refused permanently
const PERMANENT_CODES: [u16; 5] = [550, 551, 552, 553, 554];

/// SMTP reply codes meaning the recipient server refused for now
const TEMPORARY_CODES: [u16; 4] = [421, 450, 451, 452];

/// Keywords marking a failure to reach the server at all
const CONNECTIVITY_KEYWORDS: [&str; 3] = ["connection", "timeout", "dial"];

/// Result of handing a message to the outbound transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    Failed {
        /// Numeric reply code, when the transport exposes one
        code: Option<u16>,
        message: String,
    },
}

impl DeliveryOutcome {
    /// Failure described only by its text
    pub fn failed(message: impl Into<String>) -> Self {
        DeliveryOutcome::Failed {
            code: None,
            message: message.into(),
        }
    }

    /// Build an outcome from any transport result
    pub fn from_result<T, E: Display>(result: &Result<T, E>) -> Self {
        match result {
            Ok(_) => DeliveryOutcome::Delivered,
            Err(e) => DeliveryOutcome::failed(e.to_string()),
        }
    }
}

/// Status assigned to a message plus the detail to store as its reason
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub status: MessageStatus,
    /// Empty on success, otherwise the original failure text
    pub detail: String,
}

impl Classification {
    /// Detail as an optional reason field
    pub fn reason(&self) -> Option<String> {
        (!self.detail.is_empty()).then(|| self.detail.clone())
    }
}

/// Map a transport outcome to a status. First matching rule wins:
/// success, permanent code, temporary code, connectivity keyword, then
/// bounce as the fallback.
pub fn classify(outcome: &DeliveryOutcome) -> Classification {
    let (code, message) = match outcome {
        DeliveryOutcome::Delivered => {
            return Classification {
                status: MessageStatus::Delivered,
                detail: String::new(),
            };
        }
        DeliveryOutcome::Failed { code, message } => (*code, message.as_str()),
    };

    let status = if mentions_code(code, message, &PERMANENT_CODES) {
        MessageStatus::Bounce
    } else if mentions_code(code, message, &TEMPORARY_CODES) {
        MessageStatus::Blocked
    } else if is_connectivity_failure(message) {
        MessageStatus::Deferred
    } else {
        MessageStatus::Bounce
    };

    Classification {
        status,
        detail: message.to_string(),
    }
}

/// Convenience wrapper for callers holding an optional error text
pub fn classify_error(error: Option<&str>) -> Classification {
    match error {
        None => classify(&DeliveryOutcome::Delivered),
        Some(text) => classify(&DeliveryOutcome::failed(text)),
    }
}

fn mentions_code(code: Option<u16>, message: &str, codes: &[u16]) -> bool {
    if code.is_some_and(|c| codes.contains(&c)) {
        return true;
    }
    codes.iter().any(|c| message.contains(&c.to_string()))
}

fn is_connectivity_failure(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    CONNECTIVITY_KEYWORDS.iter().any(|k| lower.contains(k))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_is_delivered() {
        let c = classify_error(None);
        assert_eq!(c.status, MessageStatus::Delivered);
        assert!(c.detail.is_empty());
        assert_eq!(c.reason(), None);
    }

    #[test]
    fn test_permanent_rejection_bounces() {
        let c = classify_error(Some("550 mailbox unavailable"));
        assert_eq!(c.status, MessageStatus::Bounce);
        assert_eq!(c.detail, "550 mailbox unavailable");
        for code in ["551", "552", "553", "554"] {
            let text = format!("{} rejected", code);
            assert_eq!(classify_error(Some(&text)).status, MessageStatus::Bounce);
        }
    }

    #[test]
    fn test_temporary_rejection_is_blocked() {
        assert_eq!(classify_error(Some("421 too busy")).status, MessageStatus::Blocked);
        for code in ["450", "451", "452"] {
            let text = format!("{} try later", code);
            assert_eq!(classify_error(Some(&text)).status, MessageStatus::Blocked);
        }
    }

    #[test]
    fn test_connectivity_is_deferred() {
        assert_eq!(classify_error(Some("dial tcp: timeout")).status, MessageStatus::Deferred);
        assert_eq!(
            classify_error(Some("Connection refused")).status,
            MessageStatus::Deferred
        );
    }

    #[test]
    fn test_unknown_failure_defaults_to_bounce() {
        let c = classify_error(Some("unexpected gremlin"));
        assert_eq!(c.status, MessageStatus::Bounce);
        assert_eq!(c.reason().as_deref(), Some("unexpected gremlin"));
    }

    #[test]
    fn test_rule_order_prefers_permanent_code() {
        // both a permanent code and a connectivity keyword: permanent wins
        let c = classify_error(Some("554 connection rejected"));
        assert_eq!(c.status, MessageStatus::Bounce);
        let c = classify_error(Some("421 connection timeout"));
        assert_eq!(c.status, MessageStatus::Blocked);
    }

    #[test]
    fn test_numeric_code_without_text() {
        let outcome = DeliveryOutcome::Failed {
            code: Some(451),
            message: "local error in processing".into(),
        };
        assert_eq!(classify(&outcome).status, MessageStatus::Blocked);
    }

    #[test]
    fn test_from_result() {
        let ok: Result<(), String> = Ok(());
        assert_eq!(DeliveryOutcome::from_result(&ok), DeliveryOutcome::Delivered);
        let err: Result<(), String> = Err("dial tcp 127.0.0.1:25".into());
        assert_eq!(
            classify(&DeliveryOutcome::from_result(&err)).status,
            MessageStatus::Deferred
        );
    }
}
