use async_trait::async_trait;
use thiserror::Error;

pub mod email;
pub mod sms;

#[derive(Error, Debug)]
pub enum SenderError {
    #[error("Failed to send notification: {0}")]
    SendFailed(String),
    #[error("Invalid configuration for sender: {0}")]
    InvalidConfiguration(String),
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

/// A delivery channel (email, SMS) for outgoing notifications.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// Channel name used in logs.
    fn channel(&self) -> &'static str;

    /// Sends `body` to `recipient`. `subject` is ignored by channels without one.
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), SenderError>;
}
