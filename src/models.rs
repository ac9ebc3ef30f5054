use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// External fixture identifier from the data provider.
pub type FixtureId = u64;

/// Telegram chat identifier.
pub type ChatId = i64;

/// One fixture as reported by the data provider on a single poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fixture {
    pub id: FixtureId,
    pub league: String,
    pub home_team: String,
    pub away_team: String,
    /// `None` when the provider has no score yet
    pub home_goals: Option<u32>,
    pub away_goals: Option<u32>,
    /// Elapsed minute; `None` when missing or not an integer
    pub minute: Option<u32>,
    pub kickoff: Option<DateTime<Utc>>,
}

impl Fixture {
    /// Both goal counts, or `None` if either side is missing.
    pub fn score(&self) -> Option<Score> {
        Some(Score {
            home: self.home_goals?,
            away: self.away_goals?,
        })
    }
}

/// Goal tally for one fixture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Score {
    pub home: u32,
    pub away: u32,
}

impl Score {
    pub fn new(home: u32, away: u32) -> Self {
        Score { home, away }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Home,
    Away,
}

/// A single goal inferred from two successive score snapshots.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GoalEvent {
    pub fixture_id: FixtureId,
    pub league: String,
    pub home_team: String,
    pub away_team: String,
    pub side: Side,
    /// Score after this goal was counted
    pub score: Score,
    pub minute: Option<u32>,
}

/// Inclusive range of elapsed minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinuteWindow {
    pub start: u32,
    pub end: u32,
}

impl MinuteWindow {
    pub fn contains(&self, minute: u32) -> bool {
        (self.start..=self.end).contains(&minute)
    }
}

impl std::str::FromStr for MinuteWindow {
    type Err = String;

    /// Parses `"lo-hi"`, e.g. `"2-11"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lo, hi) = s
            .split_once('-')
            .ok_or_else(|| format!("expected '<start>-<end>', got '{}'", s))?;
        let start: u32 = lo
            .trim()
            .parse()
            .map_err(|_| format!("invalid window start '{}'", lo))?;
        let end: u32 = hi
            .trim()
            .parse()
            .map_err(|_| format!("invalid window end '{}'", hi))?;
        if start > end {
            return Err(format!("window start {} is after end {}", start, end));
        }
        Ok(MinuteWindow { start, end })
    }
}

/// Subscription classes a chat can opt into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubscriptionClass {
    /// Kickoff reminders (set by `/start`)
    General,
    /// Every goal, unconditionally
    Live,
    /// Goals inside the configured minute windows only
    Dm,
}
