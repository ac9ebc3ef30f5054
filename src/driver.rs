//! The polling loop: refresh fixtures on independent throttles, turn score
//! changes into goal alerts and send kickoff reminders.
//!
//! The driver owns every piece of mutable state (snapshot cache, reminder
//! markers, subscriptions, cached schedule). Ticks and commands are handled
//! one at a time from a single task, and state is always updated before the
//! resulting notifications fan out.

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::alerts::{detect_goals, ReminderBook, SnapshotCache};
use crate::config::AlertPolicy;
use crate::fixtures::FixtureClient;
use crate::models::{ChatId, Fixture, FixtureId, GoalEvent, SubscriptionClass};
use crate::notify::{format, NotificationRouter};
use crate::subscriptions::SubscriptionRegistry;
use crate::telegram::{BotCommand, Inbound};

/// Minimum spacing between refreshes of one data class.
#[derive(Debug, Clone)]
pub struct Throttle {
    every: Duration,
    last: Option<Instant>,
}

impl Throttle {
    pub fn new(every: Duration) -> Self {
        Throttle { every, last: None }
    }

    pub fn is_due(&self, now: Instant) -> bool {
        match self.last {
            Some(last) => now.saturating_duration_since(last) >= self.every,
            None => true,
        }
    }

    pub fn mark(&mut self, now: Instant) {
        self.last = Some(now);
    }
}

/// What happened during one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub live_refreshed: bool,
    pub scheduled_refreshed: bool,
    pub goals: usize,
    pub reminders: usize,
}

/// Answer to an inbound command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub chat: ChatId,
    pub text: String,
    /// Attach the main reply keyboard
    pub with_menu: bool,
}

pub struct Driver {
    fixtures: FixtureClient,
    router: NotificationRouter,
    policy: AlertPolicy,
    upcoming_limit: usize,
    cache: SnapshotCache,
    reminders: ReminderBook,
    subscriptions: SubscriptionRegistry,
    /// Last successfully fetched schedule; may be stale
    scheduled: Vec<Fixture>,
    live_throttle: Throttle,
    scheduled_throttle: Throttle,
}

impl Driver {
    pub fn new(
        fixtures: FixtureClient,
        router: NotificationRouter,
        policy: AlertPolicy,
        upcoming_limit: usize,
    ) -> Self {
        Driver {
            live_throttle: Throttle::new(policy.live_refresh),
            scheduled_throttle: Throttle::new(policy.scheduled_refresh),
            fixtures,
            router,
            policy,
            upcoming_limit,
            cache: SnapshotCache::new(),
            reminders: ReminderBook::new(),
            subscriptions: SubscriptionRegistry::new(),
            scheduled: Vec::new(),
        }
    }

    /// Run one scheduler tick. `now` drives the throttles, `wall` the
    /// kickoff arithmetic.
    pub async fn tick(&mut self, now: Instant, wall: DateTime<Utc>) -> TickReport {
        let mut report = TickReport::default();

        if self.live_throttle.is_due(now) {
            self.live_throttle.mark(now);
            report.live_refreshed = true;
            report.goals = self.refresh_live().await;
        }

        if self.scheduled_throttle.is_due(now) {
            self.scheduled_throttle.mark(now);
            report.scheduled_refreshed = true;
            self.refresh_scheduled(wall).await;
        }

        // Runs every tick, against a possibly stale schedule
        report.reminders = self.send_reminders(wall).await;
        report
    }

    /// Fetch live fixtures, diff against the cache, prune finished fixtures
    /// and fan out goal alerts. Returns the number of goals detected.
    async fn refresh_live(&mut self) -> usize {
        let live = match self.fixtures.try_fetch_live().await {
            Ok(live) => live,
            Err(e) => {
                // No answer is not the same as "nothing is live": keep the cache
                warn!("[{}] live refresh failed: {:#}", self.fixtures.name(), e);
                return 0;
            }
        };

        let goals = self.apply_live(&live);
        info!(
            "Live refresh: {} fixture(s), {} new goal(s), {} tracked",
            live.len(),
            goals.len(),
            self.cache.len()
        );

        for goal in &goals {
            self.router.deliver_goal(goal, &self.subscriptions).await;
        }
        goals.len()
    }

    /// Cache mutation half of a live refresh.
    fn apply_live(&mut self, live: &[Fixture]) -> Vec<GoalEvent> {
        let mut goals = Vec::new();
        for fixture in live {
            goals.extend(detect_goals(&mut self.cache, fixture));
        }
        let still_live: HashSet<FixtureId> = live.iter().map(|f| f.id).collect();
        self.cache.prune(&still_live);
        goals
    }

    async fn refresh_scheduled(&mut self, wall: DateTime<Utc>) {
        match self.fixtures.try_fetch_scheduled().await {
            Ok(scheduled) => {
                info!("Scheduled refresh: {} upcoming fixture(s)", scheduled.len());
                self.scheduled = scheduled;
            }
            Err(e) => {
                warn!(
                    "[{}] scheduled refresh failed, keeping {} cached fixture(s): {:#}",
                    self.fixtures.name(),
                    self.scheduled.len(),
                    e
                );
            }
        }
        self.reminders.sweep(wall, self.policy.marker_retention);
    }

    async fn send_reminders(&mut self, wall: DateTime<Utc>) -> usize {
        let due = self
            .reminders
            .take_due(&self.scheduled, wall, self.policy.reminder_window);
        if !due.is_empty() {
            self.router
                .deliver_reminder(&due, &self.subscriptions, wall)
                .await;
        }
        due.len()
    }

    pub async fn handle_command(&mut self, inbound: Inbound, wall: DateTime<Utc>) -> Reply {
        let chat = inbound.chat;
        let (text, with_menu) = match inbound.command {
            BotCommand::Start => {
                self.subscriptions.subscribe(chat, SubscriptionClass::General);
                info!("Chat {} subscribed", chat);
                (
                    "👋 You are subscribed to kickoff reminders.\n\n\
                     🔔 Every goal: an alert for every goal in every live match.\n\
                     🎯 Key minutes: goals in the opening and closing windows only.\n\
                     🔕 Stop: unsubscribe from everything."
                        .to_string(),
                    true,
                )
            }
            BotCommand::Live => {
                self.subscriptions.subscribe(chat, SubscriptionClass::Live);
                info!("Chat {} joined the live feed", chat);
                ("🔔 You will get an alert for every goal.".to_string(), false)
            }
            BotCommand::Dm => {
                self.subscriptions.subscribe(chat, SubscriptionClass::Dm);
                info!("Chat {} joined the key-minute feed", chat);
                (self.dm_welcome(), false)
            }
            BotCommand::Stop => {
                self.subscriptions.unsubscribe(chat);
                info!("Chat {} unsubscribed", chat);
                ("🔕 You are unsubscribed. Send /start to come back.".to_string(), false)
            }
            BotCommand::Matches => (self.query_live().await, false),
            BotCommand::Upcoming => (self.query_upcoming(self.upcoming_limit, wall), false),
        };
        Reply {
            chat,
            text,
            with_menu,
        }
    }

    fn dm_welcome(&self) -> String {
        let windows: Vec<String> = self
            .policy
            .dm_windows
            .iter()
            .map(|w| format!("{}–{}'", w.start, w.end))
            .collect();
        format!(
            "🎯 You will get goals scored in minutes {} only.",
            windows.join(" and ")
        )
    }

    /// On-demand live snapshot, bypassing the throttle and the cache.
    pub async fn query_live(&self) -> String {
        let live = self.fixtures.fetch_live().await;
        format::live_snapshot(&live)
    }

    /// Up to `limit` cached fixtures that have not kicked off, earliest first.
    pub fn query_upcoming(&self, limit: usize, wall: DateTime<Utc>) -> String {
        let mut upcoming: Vec<Fixture> = self
            .scheduled
            .iter()
            .filter(|f| f.kickoff.map_or(false, |k| k > wall))
            .cloned()
            .collect();
        upcoming.sort_by_key(|f| f.kickoff);
        upcoming.truncate(limit);
        format::upcoming_list(&upcoming)
    }

    /// Drive ticks and commands from one task until the process is stopped.
    ///
    /// A closed command channel is logged once; alerts keep flowing.
    pub async fn run(mut self, mut commands: mpsc::Receiver<Inbound>, period: Duration) {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut commands_open = true;

        loop {
            tokio::select! {
                now = interval.tick() => {
                    let report = self.tick(now, Utc::now()).await;
                    debug!("Tick finished: {:?}", report);
                }
                inbound = commands.recv(), if commands_open => match inbound {
                    Some(inbound) => {
                        let reply = self.handle_command(inbound, Utc::now()).await;
                        if let Err(e) = self
                            .router
                            .send_reply(reply.chat, &reply.text, reply.with_menu)
                            .await
                        {
                            warn!("Failed to reply to chat {}: {}", reply.chat, e);
                        }
                    }
                    None => {
                        error!("Command channel closed; commands are no longer received");
                        commands_open = false;
                    }
                },
            }
        }
    }
}
