use async_trait::async_trait;
use thiserror::Error;

use crate::models::ChatId;

#[derive(Debug, Error)]
pub enum SendError {
    /// The user blocked the bot or the chat no longer exists
    #[error("chat {0} is unreachable (bot blocked or chat deleted)")]
    Blocked(ChatId),
    #[error("messaging API rejected the request ({status}): {description}")]
    Api { status: u16, description: String },
    /// Never carries the request URL, which embeds the bot token
    #[error("transport error: {0}")]
    Transport(reqwest::Error),
}

impl SendError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, SendError::Api { status: 429, .. })
    }
}

impl From<reqwest::Error> for SendError {
    fn from(e: reqwest::Error) -> Self {
        SendError::Transport(e.without_url())
    }
}

/// Outbound message delivery. Callers never assume success.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, chat: ChatId, text: &str) -> Result<(), SendError>;

    /// Send with the bot's main menu attached, where the sink has one.
    async fn send_menu(&self, chat: ChatId, text: &str) -> Result<(), SendError> {
        self.send(chat, text).await
    }
}
