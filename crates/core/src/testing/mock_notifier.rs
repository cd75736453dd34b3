//! Mock notifier for testing.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::notify::{NotifyError, Notifier};

/// A delivered payload.
#[derive(Debug, Clone)]
pub struct RecordedSend {
    pub destination: String,
    pub payload: serde_json::Value,
}

impl RecordedSend {
    /// The pushed message, decoded from the `text` field.
    pub fn message(&self) -> Option<serde_json::Value> {
        let text = self.payload.get("text")?.as_str()?;
        serde_json::from_str(text).ok()
    }
}

/// Records sends; destinations can be made to reject payloads.
#[derive(Debug, Default)]
pub struct MockNotifier {
    sent: Arc<RwLock<Vec<RecordedSend>>>,
    rejecting: Arc<RwLock<HashSet<String>>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every payload sent to `destination`.
    pub async fn reject(&self, destination: &str) {
        self.rejecting.write().await.insert(destination.to_string());
    }

    /// Successful sends, in order.
    pub async fn sent(&self) -> Vec<RecordedSend> {
        self.sent.read().await.clone()
    }

    pub async fn sent_to(&self, destination: &str) -> Vec<RecordedSend> {
        self.sent
            .read()
            .await
            .iter()
            .filter(|s| s.destination == destination)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn send(
        &self,
        destination: &str,
        payload: &serde_json::Value,
    ) -> Result<(), NotifyError> {
        if self.rejecting.read().await.contains(destination) {
            return Err(NotifyError::Rejected {
                status: 400,
                message: "mock rejection".to_string(),
            });
        }
        self.sent.write().await.push(RecordedSend {
            destination: destination.to_string(),
            payload: payload.clone(),
        });
        Ok(())
    }
}
