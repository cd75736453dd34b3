//! Webhook delivery.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;
use tracing::{debug, info};

/// Errors from a delivery attempt.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// The webhook rejected the payload.
    #[error("Webhook rejected payload: {status} - {message}")]
    Rejected { status: u16, message: String },
}

/// Sends a JSON payload to a destination. Implementations do not retry.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(
        &self,
        destination: &str,
        payload: &serde_json::Value,
    ) -> Result<(), NotifyError>;
}

/// POSTs payloads to webhook URLs.
pub struct WebhookNotifier {
    client: Client,
}

impl WebhookNotifier {
    pub fn new(timeout: Duration) -> Result<Self, NotifyError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(
        &self,
        destination: &str,
        payload: &serde_json::Value,
    ) -> Result<(), NotifyError> {
        let response = self.client.post(destination).json(payload).send().await?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                message: body,
            });
        }

        info!(destination = %destination, status = status.as_u16(), "Webhook delivered");
        debug!(destination = %destination, response = %body, "Webhook response body");
        Ok(())
    }
}
