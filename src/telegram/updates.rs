use serde::Deserialize;

use crate::models::ChatId;

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: ChatId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotCommand {
    Start,
    Live,
    Dm,
    Stop,
    Matches,
    Upcoming,
}

pub const BUTTON_MATCHES: &str = "⚽ Live now";
pub const BUTTON_UPCOMING: &str = "📅 Upcoming";
pub const BUTTON_LIVE: &str = "🔔 Every goal";
pub const BUTTON_DM: &str = "🎯 Key minutes";
pub const BUTTON_STOP: &str = "🔕 Stop";

/// A command addressed to the bot from a specific chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Inbound {
    pub chat: ChatId,
    pub command: BotCommand,
}

impl Inbound {
    pub fn from_update(update: &Update) -> Option<Self> {
        let message = update.message.as_ref()?;
        let command = parse_command(message.text.as_deref()?)?;
        Some(Inbound {
            chat: message.chat.id,
            command,
        })
    }
}

/// Accepts `/cmd`, `/cmd@BotName args` and the menu button labels.
pub fn parse_command(text: &str) -> Option<BotCommand> {
    let text = text.trim();
    match text {
        BUTTON_MATCHES => return Some(BotCommand::Matches),
        BUTTON_UPCOMING => return Some(BotCommand::Upcoming),
        BUTTON_LIVE => return Some(BotCommand::Live),
        BUTTON_DM => return Some(BotCommand::Dm),
        BUTTON_STOP => return Some(BotCommand::Stop),
        _ => {}
    }

    let word = text.split_whitespace().next()?.strip_prefix('/')?;
    let name = word.split('@').next().unwrap_or(word);
    match name.to_lowercase().as_str() {
        "start" => Some(BotCommand::Start),
        "live" => Some(BotCommand::Live),
        "dm" => Some(BotCommand::Dm),
        "stop" => Some(BotCommand::Stop),
        "matches" => Some(BotCommand::Matches),
        "upcoming" => Some(BotCommand::Upcoming),
        _ => None,
    }
}

/// Reply keyboard shown after /start.
pub fn main_keyboard() -> serde_json::Value {
    serde_json::json!({
        "keyboard": [
            [{ "text": BUTTON_MATCHES }, { "text": BUTTON_UPCOMING }],
            [{ "text": BUTTON_LIVE }, { "text": BUTTON_DM }],
            [{ "text": BUTTON_STOP }],
        ],
        "resize_keyboard": true,
    })
}
