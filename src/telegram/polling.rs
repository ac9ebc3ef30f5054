use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

use super::client::TelegramClient;
use super::updates::Inbound;

const LONG_POLL_WAIT: Duration = Duration::from_secs(25);

/// Pull updates forever and forward recognised commands to the driver.
/// Returns once the driver side of the channel is gone.
pub async fn run_long_polling(client: TelegramClient, tx: mpsc::Sender<Inbound>) {
    let mut offset = 0i64;
    let mut backoff_secs = 1u64;
    let max_backoff = 30u64;

    info!("Telegram long polling started");

    loop {
        match client.get_updates(offset, LONG_POLL_WAIT).await {
            Ok(updates) => {
                backoff_secs = 1;
                for update in updates {
                    offset = offset.max(update.update_id + 1);
                    if let Some(inbound) = Inbound::from_update(&update) {
                        if tx.send(inbound).await.is_err() {
                            warn!("Command channel closed, stopping long polling");
                            return;
                        }
                    }
                }
            }
            Err(e) => {
                warn!("getUpdates failed: {:#}; retrying in {}s", e, backoff_secs);
                tokio::time::sleep(Duration::from_secs(backoff_secs)).await;
                backoff_secs = (backoff_secs * 2).min(max_backoff);
            }
        }
    }
}
