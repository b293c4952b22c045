use async_trait::async_trait;
use thiserror::Error;

use super::models::{ChannelConfig, Notification};

pub mod telegram;
pub mod webhook;

#[derive(Error, Debug)]
pub enum SenderError {
    #[error("Failed to send notification: {0}")]
    SendFailed(String),
    #[error("Invalid configuration for sender: {0}")]
    InvalidConfiguration(String),
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
    #[error("Templating error: {0}")]
    TemplatingError(String),
}

/// Delivers a notification over one channel type.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// `config` must be the variant this sender handles; anything else is an
    /// [`SenderError::InvalidConfiguration`].
    async fn send(
        &self,
        config: &ChannelConfig,
        notification: &Notification,
    ) -> Result<(), SenderError>;
}

/// Reads the body of a failed response for the error message.
pub(crate) async fn failure_body(response: reqwest::Response) -> String {
    response
        .text()
        .await
        .unwrap_or_else(|_| "Failed to read error body".to_string())
}
