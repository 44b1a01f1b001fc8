//! Fire-and-forget Slack webhook notifications.
//!
//! Delivery runs on a detached task; ordering is not guaranteed and a
//! failed post never affects the workflow.

use std::time::Duration;

use serde_json::json;
use tracing::debug;

use crate::config::SlackConfig;

pub struct SlackNotifier {
    client: reqwest::Client,
    webhook_url: Option<String>,
}

impl SlackNotifier {
    pub fn new(config: &SlackConfig) -> Self {
        let webhook_url = if config.notifications_enabled && !config.webhook_url.is_empty() {
            Some(config.webhook_url.clone())
        } else {
            None
        };
        Self {
            client: reqwest::Client::new(),
            webhook_url,
        }
    }

    pub fn disabled() -> Self {
        Self {
            client: reqwest::Client::new(),
            webhook_url: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.webhook_url.is_some()
    }

    /// Post `text` to the webhook without waiting for the result.
    pub fn notify(&self, text: impl Into<String>) {
        let Some(url) = self.webhook_url.clone() else {
            return;
        };
        let client = self.client.clone();
        let text = text.into();

        tokio::spawn(async move {
            let result = client
                .post(&url)
                .json(&json!({ "text": text }))
                .timeout(Duration::from_secs(10))
                .send()
                .await;
            match result {
                Ok(response) if !response.status().is_success() => {
                    debug!(status = %response.status(), "slack webhook rejected notification");
                }
                Err(err) => debug!(error = %err, "slack notification failed"),
                Ok(_) => {}
            }
        });
    }
}
