//! The single alert channel every audit publishes to

use std::sync::Arc;

use serde::Serialize;

use super::notifier::Notifier;

/// Longest subject the notification sink accepts
pub const MAX_SUBJECT_LEN: usize = 100;

/// A formatted notification, before the environment prefix is applied
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub subject: String,
    pub message: String,
}

impl Notification {
    pub fn new(subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            message: message.into(),
        }
    }
}

/// Environment-labelled, fire-and-forget alert delivery
///
/// A failed publish is logged and swallowed: by the time anything is
/// published the audit has already run, and an undelivered alert must not
/// fail the invocation.
#[derive(Clone)]
pub struct AlertChannel {
    notifier: Arc<dyn Notifier>,
    environment: String,
}

impl AlertChannel {
    pub fn new(notifier: Arc<dyn Notifier>, environment: impl AsRef<str>) -> Self {
        Self {
            notifier,
            environment: environment.as_ref().to_uppercase(),
        }
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// `[ENV] subject`, cut to the sink's subject limit on a char boundary
    pub fn subject_for(&self, subject: &str) -> String {
        let full = if self.environment.is_empty() {
            subject.to_string()
        } else {
            format!("[{}] {}", self.environment, subject)
        };
        full.chars().take(MAX_SUBJECT_LEN).collect()
    }

    /// Publish once; returns whether the sink accepted the notification
    pub async fn send(&self, notification: &Notification) -> bool {
        let subject = self.subject_for(&notification.subject);

        match self.notifier.publish(&subject, &notification.message).await {
            Ok(()) => {
                tracing::info!(subject = %subject, "Notification published");
                true
            }
            Err(e) => {
                tracing::error!(
                    subject = %subject,
                    error = %e,
                    "Failed to publish notification"
                );
                false
            }
        }
    }
}
