use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info};

mod alerts;
mod config;
mod driver;
mod fixtures;
mod models;
mod notify;
mod subscriptions;
mod telegram;

use config::Config;
use driver::Driver;
use fixtures::{ApiFootball, FixtureClient};
use notify::NotificationRouter;
use telegram::{TelegramClient, WebhookState};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing / logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    let provider = ApiFootball::new(
        &config.api_football_key,
        &config.api_football_url,
        Duration::from_secs(config.live_timeout_secs),
        Duration::from_secs(config.scheduled_timeout_secs),
        config.scheduled_lookahead,
    )?;
    let fixtures = FixtureClient::new(Arc::new(provider));

    let telegram = TelegramClient::new(
        &config.telegram_token,
        None,
        Duration::from_secs(config.send_timeout_secs),
    )?;

    let policy = config.alert_policy();
    let router = NotificationRouter::new(
        Arc::new(telegram.clone()),
        policy.dm_windows.clone(),
        policy.bet_link.clone(),
    );
    let driver = Driver::new(fixtures, router, policy, config.upcoming_limit);

    // Inbound commands reach the driver through this channel only
    let (tx, rx) = mpsc::channel(256);

    match &config.webhook_url {
        Some(base) => {
            let path = telegram::webhook::webhook_path(&config.telegram_token);
            let public_url = format!("{}{}", base.trim_end_matches('/'), path);
            telegram
                .set_webhook(&public_url)
                .await
                .context("Failed to register Telegram webhook")?;

            let app = telegram::webhook_router(WebhookState {
                secret: config.telegram_token.clone(),
                tx,
            });
            let addr: SocketAddr = config.listen_addr.parse()?;
            let listener = tokio::net::TcpListener::bind(addr).await?;
            info!("Webhook listening on http://{}", addr);
            tokio::spawn(async move {
                if let Err(e) = axum::serve(listener, app).await {
                    error!("Webhook server stopped: {}", e);
                }
            });
        }
        None => {
            telegram
                .delete_webhook()
                .await
                .context("Failed to clear Telegram webhook")?;
            tokio::spawn(telegram::run_long_polling(telegram.clone(), tx));
        }
    }

    info!(
        "Goal alert bot started (tick={}s, live every {}s, schedule every {}s)",
        config.tick_secs, config.live_refresh_secs, config.scheduled_refresh_secs
    );

    // One task owns the driver: a tick always finishes before the next
    // tick or command is looked at.
    driver.run(rx, config.tick_period()).await;

    Ok(())
}
