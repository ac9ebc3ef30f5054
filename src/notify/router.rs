use chrono::{DateTime, Utc};
use futures_util::stream::{self, StreamExt};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::format;
use super::sink::{NotificationSink, SendError};
use crate::models::{ChatId, Fixture, GoalEvent, MinuteWindow, SubscriptionClass};
use crate::subscriptions::SubscriptionRegistry;

/// Sends in flight at once during a fan-out. Telegram allows roughly 30
/// messages per second per bot.
pub const MAX_CONCURRENT_SENDS: usize = 16;

/// Outcome of one fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Decides who hears about each event and delivers best-effort.
pub struct NotificationRouter {
    sink: Arc<dyn NotificationSink>,
    dm_windows: Vec<MinuteWindow>,
    bet_link: String,
}

impl NotificationRouter {
    pub fn new(
        sink: Arc<dyn NotificationSink>,
        dm_windows: Vec<MinuteWindow>,
        bet_link: String,
    ) -> Self {
        NotificationRouter {
            sink,
            dm_windows,
            bet_link,
        }
    }

    /// Live subscribers always; DM subscribers only when the minute is known
    /// and inside one of the windows.
    pub fn goal_recipients(
        &self,
        event: &GoalEvent,
        subs: &SubscriptionRegistry,
    ) -> Vec<ChatId> {
        let mut chats: BTreeSet<ChatId> = subs
            .members(SubscriptionClass::Live)
            .iter()
            .copied()
            .collect();
        if self.in_dm_window(event.minute) {
            chats.extend(subs.members(SubscriptionClass::Dm).iter().copied());
        }
        chats.into_iter().collect()
    }

    fn in_dm_window(&self, minute: Option<u32>) -> bool {
        match minute {
            Some(m) => self.dm_windows.iter().any(|w| w.contains(m)),
            None => false,
        }
    }

    pub async fn deliver_goal(
        &self,
        event: &GoalEvent,
        subs: &SubscriptionRegistry,
    ) -> DeliveryReport {
        let chats = self.goal_recipients(event, subs);
        if chats.is_empty() {
            return DeliveryReport::default();
        }
        let text = format::goal_message(event, &self.bet_link);
        let report = self.send_all(&chats, &text).await;
        info!(
            "Goal alert {} {}-{} (minute {:?}) sent to {}/{} chat(s)",
            event.fixture_id,
            event.score.home,
            event.score.away,
            event.minute,
            report.delivered,
            chats.len()
        );
        report
    }

    /// One message listing every fixture in `due`, to general subscribers.
    pub async fn deliver_reminder(
        &self,
        due: &[Fixture],
        subs: &SubscriptionRegistry,
        now: DateTime<Utc>,
    ) -> DeliveryReport {
        if due.is_empty() {
            return DeliveryReport::default();
        }
        let chats: Vec<ChatId> = subs
            .members(SubscriptionClass::General)
            .iter()
            .copied()
            .collect();
        let text = format::reminder_message(due, now);
        let report = self.send_all(&chats, &text).await;
        info!(
            "Kickoff reminder for {} fixture(s) sent to {}/{} chat(s)",
            due.len(),
            report.delivered,
            chats.len()
        );
        report
    }

    /// Answer a command, with the main menu attached if asked.
    pub async fn send_reply(
        &self,
        chat: ChatId,
        text: &str,
        with_menu: bool,
    ) -> Result<(), SendError> {
        if with_menu {
            self.sink.send_menu(chat, text).await
        } else {
            self.sink.send(chat, text).await
        }
    }

    /// Send `text` to every chat, at most [`MAX_CONCURRENT_SENDS`] at a time.
    /// A failed chat never stops the others.
    pub async fn send_all(&self, chats: &[ChatId], text: &str) -> DeliveryReport {
        let results: Vec<(ChatId, Result<(), SendError>)> = stream::iter(chats.iter().copied())
            .map(|chat| {
                let sink = Arc::clone(&self.sink);
                async move { (chat, sink.send(chat, text).await) }
            })
            .buffer_unordered(MAX_CONCURRENT_SENDS)
            .collect()
            .await;

        let mut report = DeliveryReport::default();
        for (chat, result) in results {
            match result {
                Ok(()) => report.delivered += 1,
                Err(e) if e.is_rate_limited() => {
                    warn!("Delivery to chat {} rate limited: {}", chat, e);
                    report.failed += 1;
                }
                Err(e) => {
                    debug!("Delivery to chat {} failed: {}", chat, e);
                    report.failed += 1;
                }
            }
        }
        report
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::{Score, Side};
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Records every message; chats in `blocked` fail.
    #[derive(Default)]
    pub(crate) struct RecordingSink {
        pub sent: Mutex<Vec<(ChatId, String)>>,
        pub blocked: HashSet<ChatId>,
    }

    impl RecordingSink {
        pub fn blocking(chats: &[ChatId]) -> Self {
            RecordingSink {
                sent: Mutex::new(Vec::new()),
                blocked: chats.iter().copied().collect(),
            }
        }

        pub fn recipients(&self) -> Vec<ChatId> {
            let mut chats: Vec<ChatId> =
                self.sent.lock().unwrap().iter().map(|(c, _)| *c).collect();
            chats.sort();
            chats
        }

        pub fn clear(&self) {
            self.sent.lock().unwrap().clear();
        }
    }

    #[async_trait]
    impl NotificationSink for RecordingSink {
        async fn send(&self, chat: ChatId, text: &str) -> Result<(), SendError> {
            if self.blocked.contains(&chat) {
                return Err(SendError::Blocked(chat));
            }
            self.sent.lock().unwrap().push((chat, text.to_string()));
            Ok(())
        }
    }

    fn router(sink: Arc<RecordingSink>) -> NotificationRouter {
        NotificationRouter::new(
            sink,
            vec![
                MinuteWindow { start: 2, end: 11 },
                MinuteWindow { start: 69, end: 72 },
            ],
            "https://example.com".into(),
        )
    }

    fn goal(minute: Option<u32>) -> GoalEvent {
        GoalEvent {
            fixture_id: 1,
            league: "Premier League".into(),
            home_team: "Arsenal".into(),
            away_team: "Chelsea".into(),
            side: Side::Home,
            score: Score::new(1, 0),
            minute,
        }
    }

    fn registry() -> SubscriptionRegistry {
        let mut subs = SubscriptionRegistry::new();
        subs.subscribe(10, SubscriptionClass::Live);
        subs.subscribe(20, SubscriptionClass::Dm);
        subs.subscribe(30, SubscriptionClass::General);
        subs
    }

    #[test]
    fn test_dm_receives_only_inside_windows() {
        let r = router(Arc::new(RecordingSink::default()));
        let subs = registry();
        for minute in [2, 5, 11, 69, 72] {
            let chats = r.goal_recipients(&goal(Some(minute)), &subs);
            assert_eq!(chats, vec![10, 20], "minute {}", minute);
        }
        for minute in [0, 1, 12, 45, 68, 73, 90] {
            let chats = r.goal_recipients(&goal(Some(minute)), &subs);
            assert_eq!(chats, vec![10], "minute {}", minute);
        }
    }

    #[test]
    fn test_unknown_minute_withheld_from_dm() {
        let r = router(Arc::new(RecordingSink::default()));
        assert_eq!(r.goal_recipients(&goal(None), &registry()), vec![10]);
    }

    #[tokio::test]
    async fn test_failed_chat_does_not_stop_fanout() {
        let sink = Arc::new(RecordingSink::blocking(&[11]));
        let r = router(Arc::clone(&sink));
        let mut subs = SubscriptionRegistry::new();
        for chat in [10, 11, 12] {
            subs.subscribe(chat, SubscriptionClass::Live);
        }

        let report = r.deliver_goal(&goal(Some(50)), &subs).await;
        assert_eq!(report, DeliveryReport { delivered: 2, failed: 1 });
        assert_eq!(sink.recipients(), vec![10, 12]);
    }

    #[tokio::test]
    async fn test_reminder_goes_to_general_only() {
        let sink = Arc::new(RecordingSink::default());
        let r = router(Arc::clone(&sink));
        let now = Utc::now();
        let fixture = Fixture {
            id: 5,
            league: "Ligue 1".into(),
            home_team: "PSG".into(),
            away_team: "Lyon".into(),
            home_goals: None,
            away_goals: None,
            minute: None,
            kickoff: Some(now + chrono::Duration::minutes(10)),
        };

        let report = r.deliver_reminder(&[fixture], &registry(), now).await;
        assert_eq!(report.delivered, 1);
        assert_eq!(sink.recipients(), vec![30]);
    }

    #[tokio::test]
    async fn test_no_reminder_when_nothing_due() {
        let sink = Arc::new(RecordingSink::default());
        let r = router(Arc::clone(&sink));
        let report = r.deliver_reminder(&[], &registry(), Utc::now()).await;
        assert_eq!(report, DeliveryReport::default());
        assert!(sink.recipients().is_empty());
    }

    /// Counts how many sends overlap.
    #[derive(Default)]
    struct SlowSink {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        done: AtomicUsize,
    }

    #[async_trait]
    impl NotificationSink for SlowSink {
        async fn send(&self, _chat: ChatId, _text: &str) -> Result<(), SendError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.done.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_fanout_concurrency_is_bounded() {
        let sink = Arc::new(SlowSink::default());
        let r = NotificationRouter::new(sink.clone(), vec![], "link".into());
        let chats: Vec<ChatId> = (0..100).collect();

        let report = r.send_all(&chats, "hello").await;
        assert_eq!(report.delivered, 100);
        assert_eq!(sink.done.load(Ordering::SeqCst), 100);
        let peak = sink.peak.load(Ordering::SeqCst);
        assert!(peak <= MAX_CONCURRENT_SENDS, "peak {} in flight", peak);
        assert!(peak > 1, "sends should still overlap");
    }

    #[tokio::test]
    async fn test_reply_with_menu_uses_menu_send() {
        let sink = Arc::new(RecordingSink::default());
        let r = router(Arc::clone(&sink));
        r.send_reply(5, "welcome", true).await.unwrap();
        r.send_reply(6, "done", false).await.unwrap();
        assert_eq!(sink.recipients(), vec![5, 6]);
    }

    #[test]
    fn test_rate_limit_detection() {
        let limited = SendError::Api { status: 429, description: "Too Many Requests".into() };
        assert!(limited.is_rate_limited());
        assert!(!SendError::Blocked(1).is_rate_limited());
    }
}
