//! Outbound message transport collaborator
//!
//! Messages are fully formed before handoff; delivery ordering across
//! different recipients is not guaranteed.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;

use joule_core::domain::message::OutboundMessage;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport send failed: {0}")]
    SendFailed(String),
}

/// Delivery of one outbound message at a time
#[async_trait]
pub trait OutboundTransport: Send + Sync {
    async fn send(&self, message: &OutboundMessage) -> Result<(), TransportError>;
}

/// Post-office transport delivering messages over HTTP
#[derive(Debug, Clone)]
pub struct PostOfficeTransport {
    url: String,
    client: reqwest::Client,
}

impl PostOfficeTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl OutboundTransport for PostOfficeTransport {
    async fn send(&self, message: &OutboundMessage) -> Result<(), TransportError> {
        let response = self
            .client
            .post(&self.url)
            .json(message)
            .send()
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::SendFailed(format!(
                "post office returned status {}",
                status
            )));
        }

        tracing::debug!(
            receiver = %message.receiver_id,
            aggregation_type = %message.aggregation_type,
            "Message delivered to post office"
        );
        Ok(())
    }
}

/// In-memory transport collecting messages, for tests and embedded runs
#[derive(Debug, Default)]
pub struct InMemoryTransport {
    messages: Mutex<Vec<OutboundMessage>>,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything sent so far
    pub async fn sent(&self) -> Vec<OutboundMessage> {
        self.messages.lock().await.clone()
    }
}

#[async_trait]
impl OutboundTransport for InMemoryTransport {
    async fn send(&self, message: &OutboundMessage) -> Result<(), TransportError> {
        self.messages.lock().await.push(message.clone());
        Ok(())
    }
}
