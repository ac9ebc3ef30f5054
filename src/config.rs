use clap::Parser;
use std::time::Duration;
use url::Url;

use crate::models::MinuteWindow;

/// Football goal and kickoff alerts for Telegram
#[derive(Parser, Debug, Clone)]
#[command(name = "goal-alert-bot", version, about)]
pub struct Config {
    /// Telegram bot token
    #[arg(long, env = "TELEGRAM_TOKEN")]
    pub telegram_token: String,

    /// API-Football key
    #[arg(long, env = "API_FOOTBALL_KEY")]
    pub api_football_key: String,

    /// API-Football base URL
    #[arg(
        long,
        env = "API_FOOTBALL_URL",
        default_value = "https://v3.football.api-sports.io"
    )]
    pub api_football_url: String,

    /// Link appended to every goal notification
    #[arg(long, env = "BET_LINK", default_value = "https://melbet.ru/ru/sport")]
    pub bet_link: String,

    /// Public base URL for the Telegram webhook. Long polling is used when unset.
    #[arg(long, env = "WEBHOOK_URL")]
    pub webhook_url: Option<String>,

    /// Webhook listen address
    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:8080")]
    pub listen_addr: String,

    /// Scheduler tick period in seconds
    #[arg(long, env = "TICK_SECS", default_value = "30")]
    pub tick_secs: u64,

    /// Minimum seconds between live fixture refreshes
    #[arg(long, env = "LIVE_REFRESH_SECS", default_value = "30")]
    pub live_refresh_secs: u64,

    /// Minimum seconds between scheduled fixture refreshes
    #[arg(long, env = "SCHEDULED_REFRESH_SECS", default_value = "600")]
    pub scheduled_refresh_secs: u64,

    /// Request timeout for the live fixtures endpoint
    #[arg(long, env = "LIVE_TIMEOUT_SECS", default_value = "5")]
    pub live_timeout_secs: u64,

    /// Request timeout for the scheduled fixtures endpoint
    #[arg(long, env = "SCHEDULED_TIMEOUT_SECS", default_value = "10")]
    pub scheduled_timeout_secs: u64,

    /// Request timeout for Telegram sendMessage
    #[arg(long, env = "SEND_TIMEOUT_SECS", default_value = "5")]
    pub send_timeout_secs: u64,

    /// Early minute window for DM subscribers, inclusive
    #[arg(long, env = "EARLY_WINDOW", default_value = "2-11")]
    pub early_window: MinuteWindow,

    /// Late minute window for DM subscribers, inclusive
    #[arg(long, env = "LATE_WINDOW", default_value = "69-72")]
    pub late_window: MinuteWindow,

    /// Minutes before kickoff during which a reminder may fire, inclusive
    #[arg(long, env = "REMINDER_WINDOW", default_value = "9-11")]
    pub reminder_window: MinuteWindow,

    /// Number of upcoming fixtures requested on each scheduled refresh
    #[arg(long, env = "SCHEDULED_LOOKAHEAD", default_value = "50")]
    pub scheduled_lookahead: u32,

    /// Number of fixtures listed by /upcoming
    #[arg(long, env = "UPCOMING_LIMIT", default_value = "10")]
    pub upcoming_limit: usize,

    /// Hours after kickoff before a reminder marker is forgotten
    #[arg(long, env = "MARKER_RETENTION_HOURS", default_value = "24")]
    pub marker_retention_hours: i64,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.telegram_token.trim().is_empty() {
            anyhow::bail!("TELEGRAM_TOKEN must not be empty");
        }
        if self.api_football_key.trim().is_empty() {
            anyhow::bail!("API_FOOTBALL_KEY must not be empty");
        }
        Url::parse(&self.api_football_url)
            .map_err(|e| anyhow::anyhow!("invalid API_FOOTBALL_URL: {}", e))?;
        if let Some(webhook) = &self.webhook_url {
            Url::parse(webhook).map_err(|e| anyhow::anyhow!("invalid WEBHOOK_URL: {}", e))?;
        }
        if self.tick_secs == 0 || self.live_refresh_secs == 0 || self.scheduled_refresh_secs == 0 {
            anyhow::bail!("tick and refresh intervals must be positive");
        }
        if self.live_timeout_secs == 0
            || self.scheduled_timeout_secs == 0
            || self.send_timeout_secs == 0
        {
            anyhow::bail!("request timeouts must be positive");
        }
        if self.marker_retention_hours <= 0 {
            anyhow::bail!("marker_retention_hours must be positive");
        }
        Ok(())
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_secs(self.tick_secs)
    }

    pub fn alert_policy(&self) -> AlertPolicy {
        AlertPolicy {
            dm_windows: vec![self.early_window, self.late_window],
            reminder_window: self.reminder_window,
            live_refresh: Duration::from_secs(self.live_refresh_secs),
            scheduled_refresh: Duration::from_secs(self.scheduled_refresh_secs),
            marker_retention: chrono::Duration::hours(self.marker_retention_hours),
            bet_link: self.bet_link.clone(),
        }
    }
}

/// The subset of configuration the driver and router act on.
#[derive(Debug, Clone)]
pub struct AlertPolicy {
    /// A DM subscriber only hears about goals scored inside one of these
    pub dm_windows: Vec<MinuteWindow>,
    /// Minutes before kickoff
    pub reminder_window: MinuteWindow,
    pub live_refresh: Duration,
    pub scheduled_refresh: Duration,
    pub marker_retention: chrono::Duration,
    pub bet_link: String,
}

impl Default for AlertPolicy {
    fn default() -> Self {
        AlertPolicy {
            dm_windows: vec![
                MinuteWindow { start: 2, end: 11 },
                MinuteWindow { start: 69, end: 72 },
            ],
            reminder_window: MinuteWindow { start: 9, end: 11 },
            live_refresh: Duration::from_secs(30),
            scheduled_refresh: Duration::from_secs(600),
            marker_retention: chrono::Duration::hours(24),
            bet_link: "https://melbet.ru/ru/sport".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Config {
        let mut args = vec![
            "goal-alert-bot",
            "--telegram-token",
            "123:abc",
            "--api-football-key",
            "key",
        ];
        args.extend_from_slice(extra);
        Config::parse_from(args)
    }

    #[test]
    fn test_defaults_match_reference_policy() {
        let config = parse(&[]);
        config.validate().unwrap();
        let policy = config.alert_policy();
        assert_eq!(policy.dm_windows, AlertPolicy::default().dm_windows);
        assert_eq!(policy.reminder_window, MinuteWindow { start: 9, end: 11 });
        assert_eq!(policy.live_refresh, Duration::from_secs(30));
        assert_eq!(policy.scheduled_refresh, Duration::from_secs(600));
        assert_eq!(config.tick_period(), Duration::from_secs(30));
    }

    #[test]
    fn test_custom_windows() {
        let config = parse(&["--early-window", "1-15", "--late-window", "80-90"]);
        let policy = config.alert_policy();
        assert_eq!(policy.dm_windows[0], MinuteWindow { start: 1, end: 15 });
        assert_eq!(policy.dm_windows[1], MinuteWindow { start: 80, end: 90 });
    }

    #[test]
    fn test_validate_rejects_zero_tick() {
        let config = parse(&["--tick-secs", "0"]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_webhook_url() {
        let config = parse(&["--webhook-url", "not a url"]);
        assert!(config.validate().is_err());
    }
}
