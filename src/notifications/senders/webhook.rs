use async_trait::async_trait;
use reqwest::{Client, Method, header};
use tera::{Context, Tera};

use super::{NotificationSender, SenderError, failure_body};
use crate::notifications::models::{ChannelConfig, Notification};

/// Pushes notifications to a custom HTTP endpoint.
pub struct WebhookSender {
    client: Client,
}

impl Default for WebhookSender {
    fn default() -> Self {
        Self::new(Client::new())
    }
}

impl WebhookSender {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn render_body(
        template: Option<&str>,
        notification: &Notification,
    ) -> Result<String, SenderError> {
        match template {
            Some(template) => {
                let mut context = Context::new();
                for (key, value) in notification.template_context() {
                    context.insert(key, &value);
                }
                Tera::one_off(template, &context, false)
                    .map_err(|e| SenderError::TemplatingError(e.to_string()))
            }
            None => serde_json::to_string(notification)
                .map_err(|e| SenderError::TemplatingError(e.to_string())),
        }
    }
}

#[async_trait]
impl NotificationSender for WebhookSender {
    async fn send(
        &self,
        config: &ChannelConfig,
        notification: &Notification,
    ) -> Result<(), SenderError> {
        let ChannelConfig::Webhook {
            url,
            method,
            headers,
            body_template,
        } = config
        else {
            return Err(SenderError::InvalidConfiguration(
                "Expected Webhook config, but found a different type.".to_string(),
            ));
        };

        let http_method = match method.to_uppercase().as_str() {
            "POST" => Method::POST,
            "GET" => Method::GET,
            _ => {
                return Err(SenderError::InvalidConfiguration(format!(
                    "Unsupported HTTP method: {method}"
                )));
            }
        };

        let mut request_builder = self.client.request(http_method.clone(), url);

        if let Some(h) = headers {
            let mut header_map = header::HeaderMap::new();
            for (key, value) in h {
                let header_name = header::HeaderName::from_bytes(key.as_bytes()).map_err(|e| {
                    SenderError::InvalidConfiguration(format!("Invalid header name: {e}"))
                })?;
                let header_value = header::HeaderValue::from_str(value).map_err(|e| {
                    SenderError::InvalidConfiguration(format!("Invalid header value: {e}"))
                })?;
                header_map.insert(header_name, header_value);
            }
            request_builder = request_builder.headers(header_map);
        }

        if http_method == Method::POST {
            let body = Self::render_body(body_template.as_deref(), notification)?;
            request_builder = request_builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(body);
        } else {
            request_builder = request_builder.query(&[
                ("kind", notification.kind.to_string()),
                ("title", notification.title.clone()),
                ("message", notification.message.clone()),
            ]);
        }

        let response = request_builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = failure_body(response).await;
            return Err(SenderError::SendFailed(format!(
                "Webhook returned non-success status: {status}. Body: {body}"
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::models::NotificationKind;
    use std::collections::HashMap;
    use wiremock::matchers::{body_json, body_string, header as header_matcher, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn webhook(url: String, method: &str, body_template: Option<&str>) -> ChannelConfig {
        ChannelConfig::Webhook {
            url,
            method: method.to_string(),
            headers: Some(HashMap::from([("X-Token".to_string(), "secret".to_string())])),
            body_template: body_template.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn posts_json_notification_by_default() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(header_matcher("X-Token", "secret"))
            .and(body_json(serde_json::json!({
                "kind": "error",
                "title": "API is down",
                "message": "3 consecutive failures"
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let config = webhook(format!("{}/hook", server.uri()), "post", None);
        let notification =
            Notification::new(NotificationKind::Error, "API is down", "3 consecutive failures");
        WebhookSender::default().send(&config, &notification).await.unwrap();
    }

    #[tokio::test]
    async fn renders_body_template() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string("{\"text\":\"[success] API has recovered\"}"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let config = webhook(
            server.uri(),
            "POST",
            Some("{\"text\":\"[{{ kind }}] {{ title }}\"}"),
        );
        let notification = Notification::new(NotificationKind::Success, "API has recovered", "");
        WebhookSender::default().send(&config, &notification).await.unwrap();
    }

    #[tokio::test]
    async fn get_webhook_passes_fields_as_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("kind", "error"))
            .and(query_param("title", "API is down"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let config = webhook(server.uri(), "GET", None);
        let notification = Notification::new(NotificationKind::Error, "API is down", "m");
        WebhookSender::default().send(&config, &notification).await.unwrap();
    }

    #[tokio::test]
    async fn unsupported_method_is_rejected() {
        let config = webhook("http://localhost/hook".to_string(), "PATCH", None);
        let err = WebhookSender::default()
            .send(&config, &Notification::new(NotificationKind::Error, "t", "m"))
            .await
            .unwrap_err();
        assert!(matches!(err, SenderError::InvalidConfiguration(_)));
    }

    #[test]
    fn broken_template_is_a_templating_error() {
        let notification = Notification::new(NotificationKind::Error, "t", "m");
        let err = WebhookSender::render_body(Some("{{ title"), &notification).unwrap_err();
        assert!(matches!(err, SenderError::TemplatingError(_)));
    }
}
