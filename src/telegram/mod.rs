pub mod client;
pub mod polling;
pub mod updates;
pub mod webhook;

pub use client::TelegramClient;
pub use polling::run_long_polling;
pub use updates::{BotCommand, Inbound};
pub use webhook::{router as webhook_router, WebhookState};
