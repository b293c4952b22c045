use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use super::{NotificationSender, SenderError, failure_body};
use crate::notifications::models::{ChannelConfig, Notification, NotificationKind};

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Pushes notifications through the Telegram Bot API.
pub struct TelegramSender {
    client: Client,
    api_base: String,
}

impl Default for TelegramSender {
    fn default() -> Self {
        Self::new(Client::new())
    }
}

impl TelegramSender {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            api_base: TELEGRAM_API_BASE.to_string(),
        }
    }

    /// Points the sender at a different Bot API host.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Escapes text for Telegram MarkdownV2.
    fn escape_markdown_v2(text: &str) -> String {
        let mut escaped = String::with_capacity(text.len());
        for c in text.chars() {
            if matches!(
                c,
                '_' | '*' | '[' | ']' | '(' | ')' | '~' | '`' | '>' | '#' | '+' | '-' | '='
                    | '|' | '{' | '}' | '.' | '!' | '\\'
            ) {
                escaped.push('\\');
            }
            escaped.push(c);
        }
        escaped
    }

    fn render(notification: &Notification) -> String {
        let marker = match notification.kind {
            NotificationKind::Error => "🔴",
            NotificationKind::Success => "🟢",
        };
        format!(
            "{marker} *{}*\n{}",
            Self::escape_markdown_v2(&notification.title),
            Self::escape_markdown_v2(&notification.message)
        )
    }
}

#[derive(Serialize)]
struct TelegramMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
}

#[async_trait]
impl NotificationSender for TelegramSender {
    async fn send(
        &self,
        config: &ChannelConfig,
        notification: &Notification,
    ) -> Result<(), SenderError> {
        let ChannelConfig::Telegram { bot_token, chat_id } = config else {
            return Err(SenderError::InvalidConfiguration(
                "Expected Telegram config, but found a different type.".to_string(),
            ));
        };

        let api_url = format!("{}/bot{bot_token}/sendMessage", self.api_base);
        let text = Self::render(notification);
        let payload = TelegramMessage {
            chat_id,
            text: &text,
            parse_mode: "MarkdownV2",
        };

        let response = self.client.post(&api_url).json(&payload).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = failure_body(response).await;
            return Err(SenderError::SendFailed(format!(
                "Telegram API returned non-success status: {status}. Body: {body}"
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn markdown_special_characters_are_escaped() {
        assert_eq!(
            TelegramSender::escape_markdown_v2("api.example.com (eu-1)!"),
            "api\\.example\\.com \\(eu\\-1\\)\\!"
        );
    }

    #[test]
    fn render_bolds_title_and_marks_kind() {
        let text = TelegramSender::render(&Notification::new(
            NotificationKind::Success,
            "API has recovered",
            "Back to operational.",
        ));
        assert_eq!(text, "🟢 *API has recovered*\nBack to operational\\.");
    }

    #[tokio::test]
    async fn posts_message_to_bot_api() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot123:abc/sendMessage"))
            .and(body_partial_json(serde_json::json!({
                "chat_id": "-100",
                "parse_mode": "MarkdownV2"
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let sender = TelegramSender::default().with_api_base(server.uri());
        let config = ChannelConfig::Telegram {
            bot_token: "123:abc".to_string(),
            chat_id: "-100".to_string(),
        };
        let notification = Notification::new(NotificationKind::Error, "API is down", "3 failures");

        sender.send(&config, &notification).await.unwrap();
    }

    #[tokio::test]
    async fn api_rejection_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
            .mount(&server)
            .await;

        let sender = TelegramSender::default().with_api_base(server.uri());
        let config = ChannelConfig::Telegram {
            bot_token: "bad".to_string(),
            chat_id: "1".to_string(),
        };
        let err = sender
            .send(&config, &Notification::new(NotificationKind::Error, "t", "m"))
            .await
            .unwrap_err();
        assert!(matches!(err, SenderError::SendFailed(msg) if msg.contains("Unauthorized")));
    }

    #[tokio::test]
    async fn rejects_foreign_config() {
        let config = ChannelConfig::Webhook {
            url: "http://localhost".to_string(),
            method: "POST".to_string(),
            headers: None,
            body_template: None,
        };
        let err = TelegramSender::default()
            .send(&config, &Notification::new(NotificationKind::Error, "t", "m"))
            .await
            .unwrap_err();
        assert!(matches!(err, SenderError::InvalidConfiguration(_)));
    }
}
