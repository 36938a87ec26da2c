//! Chat webhook notifier.
//!
//! Posts `{"content": "<message>"}`, the shape Discord-style incoming
//! webhooks accept.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::application::ports::{Notification, NotifierPort, NotifyError};

/// Longest message chat webhooks accept.
const MAX_CONTENT_CHARS: usize = 2000;

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    content: &'a str,
}

/// Notifier posting to a webhook URL.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: Client,
    url: String,
}

impl WebhookNotifier {
    /// Notifier for `url`.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotifyError::Delivery(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl NotifierPort for WebhookNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        let mut content = notification.message();
        if content.chars().count() > MAX_CONTENT_CHARS {
            content = content.chars().take(MAX_CONTENT_CHARS).collect();
        }

        let response = self
            .client
            .post(&self.url)
            .json(&WebhookPayload { content: &content })
            .send()
            .await
            .map_err(|e| NotifyError::Delivery(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Status(status.as_u16()));
        }
        tracing::debug!(kind = notification.kind(), "Notification delivered");
        Ok(())
    }
}
