//! Upcoming-kickoff reminders.
//!
//! A fixture is flagged the first time it is seen inside the look-ahead
//! window and never reminded about again. Flags are kept until the kickoff is
//! older than the retention period, by which time the fixture can no longer
//! fall inside the window.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tracing::debug;

use crate::models::{Fixture, FixtureId, MinuteWindow};

#[derive(Debug, Default)]
pub struct ReminderBook {
    /// fixture id → kickoff time
    notified: HashMap<FixtureId, DateTime<Utc>>,
}

impl ReminderBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fixtures from `scheduled` that kick off within `window` minutes of
    /// `now` and have not been reminded about yet. Returned fixtures are
    /// flagged immediately.
    pub fn take_due(
        &mut self,
        scheduled: &[Fixture],
        now: DateTime<Utc>,
        window: MinuteWindow,
    ) -> Vec<Fixture> {
        let earliest = Duration::minutes(window.start as i64);
        let latest = Duration::minutes(window.end as i64);

        let mut due = Vec::new();
        for fixture in scheduled {
            let kickoff = match fixture.kickoff {
                Some(k) => k,
                None => continue,
            };
            let until = kickoff - now;
            if until < earliest || until > latest {
                continue;
            }
            if self.notified.contains_key(&fixture.id) {
                continue;
            }
            self.notified.insert(fixture.id, kickoff);
            due.push(fixture.clone());
        }
        due
    }

    /// Drop flags for fixtures that kicked off more than `retention` ago.
    pub fn sweep(&mut self, now: DateTime<Utc>, retention: Duration) {
        let before = self.notified.len();
        self.notified.retain(|_, kickoff| now - *kickoff <= retention);
        let removed = before - self.notified.len();
        if removed > 0 {
            debug!("ReminderBook: swept {} old marker(s)", removed);
        }
    }

    #[cfg(test)]
    pub fn is_flagged(&self, id: FixtureId) -> bool {
        self.notified.contains_key(&id)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.notified.len()
    }
}
