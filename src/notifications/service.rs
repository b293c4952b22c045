use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;
use tracing::{error, info, warn};

use super::NotificationSink;
use super::models::{ChannelConfig, Notification, NotificationKind};
use super::senders::{
    NotificationSender, SenderError, telegram::TelegramSender, webhook::WebhookSender,
};

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("Sender error: {0}")]
    SenderError(#[from] SenderError),
    #[error("{failed} of {total} notification channels failed; last error: {last}")]
    ChannelsFailed {
        failed: usize,
        total: usize,
        last: SenderError,
    },
}

/// Fans every notification out to the configured channels.
pub struct NotificationService {
    channels: Vec<ChannelConfig>,
    telegram: TelegramSender,
    webhook: WebhookSender,
}

impl NotificationService {
    pub fn new(channels: Vec<ChannelConfig>) -> Self {
        let client = Client::new();
        Self::with_senders(
            channels,
            TelegramSender::new(client.clone()),
            WebhookSender::new(client),
        )
    }

    pub fn with_senders(
        channels: Vec<ChannelConfig>,
        telegram: TelegramSender,
        webhook: WebhookSender,
    ) -> Self {
        Self {
            channels,
            telegram,
            webhook,
        }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    fn sender_for(&self, config: &ChannelConfig) -> &dyn NotificationSender {
        match config {
            ChannelConfig::Telegram { .. } => &self.telegram,
            ChannelConfig::Webhook { .. } => &self.webhook,
        }
    }
}

#[async_trait]
impl NotificationSink for NotificationService {
    async fn notify(
        &self,
        kind: NotificationKind,
        title: &str,
        message: &str,
    ) -> Result<(), NotificationError> {
        match kind {
            NotificationKind::Error => warn!(title = %title, "{message}"),
            NotificationKind::Success => info!(title = %title, "{message}"),
        }

        let notification = Notification::new(kind, title, message);
        let mut failed = 0;
        let mut last_error: Option<SenderError> = None;

        for channel in &self.channels {
            if let Err(e) = self.sender_for(channel).send(channel, &notification).await {
                error!(channel_type = channel.channel_type(), error = %e, "Failed to deliver notification.");
                failed += 1;
                last_error = Some(e);
            }
        }

        match last_error {
            Some(last) => Err(NotificationError::ChannelsFailed {
                failed,
                total: self.channels.len(),
                last,
            }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn webhook(url: String) -> ChannelConfig {
        ChannelConfig::Webhook {
            url,
            method: "POST".to_string(),
            headers: None,
            body_template: None,
        }
    }

    #[tokio::test]
    async fn without_channels_notify_only_logs() {
        let service = NotificationService::new(Vec::new());
        assert_eq!(service.channel_count(), 0);
        service
            .notify(NotificationKind::Success, "API has recovered", "ok")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn delivers_to_every_channel() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(2)
            .mount(&server)
            .await;

        let service = NotificationService::new(vec![
            webhook(format!("{}/a", server.uri())),
            webhook(format!("{}/b", server.uri())),
        ]);
        service
            .notify(NotificationKind::Error, "API is down", "3 failures")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn failing_channel_does_not_block_the_rest() {
        let healthy = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&healthy)
            .await;
        let broken = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&broken)
            .await;

        let service = NotificationService::new(vec![webhook(broken.uri()), webhook(healthy.uri())]);
        let err = service
            .notify(NotificationKind::Error, "API is down", "3 failures")
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            NotificationError::ChannelsFailed { failed: 1, total: 2, .. }
        ));
    }
}
