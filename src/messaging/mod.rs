use async_trait::async_trait;
use thiserror::Error;

pub mod broadcast;
pub mod cooldown;
pub mod twilio;

#[derive(Error, Debug)]
pub enum SenderError {
    #[error("Failed to send message: {0}")]
    SendFailed(String),
    #[error("Invalid gateway configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

/// What the provider hands back for an accepted message: its identifier and
/// the initial status (usually "queued"), later superseded by callbacks.
#[derive(Debug, Clone)]
pub struct ProviderMessage {
    pub sid: String,
    pub status: String,
}

/// A trait for dispatching one text message to one recipient. The concrete
/// implementation talks to Twilio; tests substitute their own.
#[async_trait]
pub trait SmsSender: Send + Sync {
    /// Cheap credential check so a misconfigured gateway fails a broadcast
    /// before any dispatch starts instead of once per recipient.
    fn ensure_configured(&self) -> Result<(), SenderError>;

    async fn send(&self, to: &str, body: &str) -> Result<ProviderMessage, SenderError>;
}
