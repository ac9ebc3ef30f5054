use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

use super::updates::{main_keyboard, Update};
use crate::models::ChatId;
use crate::notify::{NotificationSink, SendError};

/// Minimal Telegram Bot API client.
#[derive(Clone)]
pub struct TelegramClient {
    http: Client,
    token: String,
    /// Base URL for overriding in tests
    api_url: String,
    send_timeout: Duration,
}

/// Envelope shared by every Bot API response.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    error_code: Option<u16>,
    description: Option<String>,
}

impl TelegramClient {
    pub fn new(token: &str, api_url: Option<&str>, send_timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .build()
            .context("Failed to build HTTP client")?;
        Ok(TelegramClient {
            http,
            token: token.to_string(),
            api_url: api_url
                .unwrap_or("https://api.telegram.org")
                .trim_end_matches('/')
                .to_string(),
            send_timeout,
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_url, self.token, method)
    }

    /// sendMessage, optionally attaching a reply keyboard.
    pub async fn send_message(
        &self,
        chat: ChatId,
        text: &str,
        keyboard: Option<serde_json::Value>,
    ) -> Result<(), SendError> {
        let mut body = serde_json::json!({
            "chat_id": chat,
            "text": text,
            "disable_web_page_preview": true,
        });
        if let Some(markup) = keyboard {
            body["reply_markup"] = markup;
        }

        let resp = self
            .http
            .post(self.method_url("sendMessage"))
            .json(&body)
            .timeout(self.send_timeout)
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }

        let parsed: Option<ApiResponse<serde_json::Value>> = resp.json().await.ok();
        let description = parsed
            .and_then(|r| r.description)
            .unwrap_or_else(|| status.to_string());
        Err(classify_send_failure(chat, status.as_u16(), description))
    }

    /// Long-poll getUpdates. `wait` is the server-side hold time.
    pub async fn get_updates(&self, offset: i64, wait: Duration) -> Result<Vec<Update>> {
        let resp = self
            .http
            .get(self.method_url("getUpdates"))
            .query(&[
                ("offset", offset.to_string()),
                ("timeout", wait.as_secs().to_string()),
                ("allowed_updates", r#"["message"]"#.to_string()),
            ])
            .timeout(wait + Duration::from_secs(10))
            .send()
            .await
            .map_err(reqwest::Error::without_url)
            .context("getUpdates request failed")?;

        let status = resp.status();
        let parsed: ApiResponse<Vec<Update>> = resp
            .json()
            .await
            .map_err(reqwest::Error::without_url)
            .with_context(|| format!("Failed to parse getUpdates response ({})", status))?;
        into_result("getUpdates", parsed)
    }

    pub async fn set_webhook(&self, url: &str) -> Result<()> {
        let parsed: ApiResponse<bool> = self
            .http
            .post(self.method_url("setWebhook"))
            .json(&serde_json::json!({ "url": url, "allowed_updates": ["message"] }))
            .timeout(self.send_timeout)
            .send()
            .await
            .map_err(reqwest::Error::without_url)
            .context("setWebhook request failed")?
            .json()
            .await
            .map_err(reqwest::Error::without_url)
            .context("Failed to parse setWebhook response")?;
        into_result("setWebhook", parsed)?;
        info!("Telegram webhook registered");
        Ok(())
    }

    /// Needed before long polling if a webhook was registered earlier.
    pub async fn delete_webhook(&self) -> Result<()> {
        let parsed: ApiResponse<bool> = self
            .http
            .post(self.method_url("deleteWebhook"))
            .timeout(self.send_timeout)
            .send()
            .await
            .map_err(reqwest::Error::without_url)
            .context("deleteWebhook request failed")?
            .json()
            .await
            .map_err(reqwest::Error::without_url)
            .context("Failed to parse deleteWebhook response")?;
        into_result("deleteWebhook", parsed)?;
        debug!("Telegram webhook cleared");
        Ok(())
    }
}

#[async_trait]
impl NotificationSink for TelegramClient {
    async fn send(&self, chat: ChatId, text: &str) -> Result<(), SendError> {
        self.send_message(chat, text, None).await
    }

    async fn send_menu(&self, chat: ChatId, text: &str) -> Result<(), SendError> {
        self.send_message(chat, text, Some(main_keyboard())).await
    }
}

fn into_result<T>(method: &str, resp: ApiResponse<T>) -> Result<T> {
    match (resp.ok, resp.result) {
        (true, Some(result)) => Ok(result),
        _ => anyhow::bail!(
            "{} failed ({}): {}",
            method,
            resp.error_code.unwrap_or_default(),
            resp.description.unwrap_or_else(|| "no description".to_string())
        ),
    }
}

fn classify_send_failure(chat: ChatId, status: u16, description: String) -> SendError {
    if status == 403 || description.contains("chat not found") {
        SendError::Blocked(chat)
    } else {
        SendError::Api { status, description }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_url() {
        let client = TelegramClient::new("123:abc", None, Duration::from_secs(5)).unwrap();
        assert_eq!(
            client.method_url("sendMessage"),
            "https://api.telegram.org/bot123:abc/sendMessage"
        );
    }

    #[test]
    fn test_blocked_classification() {
        assert!(matches!(
            classify_send_failure(1, 403, "Forbidden: bot was blocked by the user".into()),
            SendError::Blocked(1)
        ));
        assert!(matches!(
            classify_send_failure(1, 400, "Bad Request: chat not found".into()),
            SendError::Blocked(1)
        ));
        assert!(matches!(
            classify_send_failure(1, 429, "Too Many Requests".into()),
            SendError::Api { status: 429, .. }
        ));
    }

    #[test]
    fn test_into_result_surfaces_description() {
        let resp: ApiResponse<bool> = serde_json::from_str(
            r#"{"ok":false,"error_code":401,"description":"Unauthorized"}"#,
        )
        .unwrap();
        let err = into_result("setWebhook", resp).unwrap_err();
        assert!(err.to_string().contains("Unauthorized"));
    }

    #[tokio::test]
    async fn test_transport_errors_do_not_leak_token() {
        // Nothing listens on port 1, so every request is refused
        let token = "123456:SECRET-TOKEN";
        let client =
            TelegramClient::new(token, Some("http://127.0.0.1:1"), Duration::from_secs(2)).unwrap();

        let err = client.send_message(1, "hi", None).await.unwrap_err();
        assert!(matches!(err, SendError::Transport(_)));
        let text = format!("{} {:?}", err, err);
        assert!(!text.contains("SECRET-TOKEN"), "token leaked: {}", text);

        let err = client.get_updates(0, Duration::from_secs(0)).await.unwrap_err();
        let text = format!("{:#} {:?}", err, err);
        assert!(!text.contains("SECRET-TOKEN"), "token leaked: {}", text);

        let err = client.set_webhook("https://example.com/hook").await.unwrap_err();
        assert!(!format!("{:#}", err).contains("SECRET-TOKEN"));

        let err = client.delete_webhook().await.unwrap_err();
        assert!(!format!("{:#}", err).contains("SECRET-TOKEN"));
    }
}
