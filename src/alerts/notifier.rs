//! Notification sinks

use std::collections::HashMap;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

/// Publish-and-forget notification sink
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one notification. No read-back, no idempotency key.
    async fn publish(&self, subject: &str, message: &str) -> Result<(), NotifierError>;
}

/// Posts notifications to an HTTP fan-out endpoint
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
    headers: HashMap<String, String>,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            headers: HashMap::new(),
        }
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn publish(&self, subject: &str, message: &str) -> Result<(), NotifierError> {
        let payload = serde_json::json!({
            "subject": subject,
            "message": message,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        let mut request = self.client.post(&self.url).json(&payload);

        for (key, value) in &self.headers {
            request = request.header(key, value);
        }

        let response = request.send().await.map_err(|e| {
            NotifierError::Webhook(format!("Failed to send webhook: {}", e))
        })?;

        if !response.status().is_success() {
            return Err(NotifierError::Webhook(format!(
                "Webhook returned status {}",
                response.status()
            )));
        }

        tracing::debug!(url = %self.url, subject = %subject, "Webhook notification sent");

        Ok(())
    }
}

/// Writes notifications to the log; used when no webhook is configured
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn publish(&self, subject: &str, message: &str) -> Result<(), NotifierError> {
        tracing::warn!(subject = %subject, "Alert: {}", message);
        Ok(())
    }
}

/// Notifier errors
#[derive(Debug, thiserror::Error)]
pub enum NotifierError {
    #[error("Webhook error: {0}")]
    Webhook(String),
}
