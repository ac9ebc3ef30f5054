use tracing::warn;

use crate::models::{Fixture, GoalEvent, Score, Side};

use super::cache::SnapshotCache;

/// Most goals one side can plausibly add between two polls. Larger jumps
/// come from a corrupt feed and are capped.
pub const MAX_GOALS_PER_POLL: u32 = 10;

/// Compare `fixture` against its cached snapshot, emit one event per new goal
/// and store the current score as the new baseline.
///
/// Home goals come before away goals. A score that went down since the last
/// poll yields no events for that side. Fixtures without both goal counts are
/// skipped and leave the cache untouched.
pub fn detect_goals(cache: &mut SnapshotCache, fixture: &Fixture) -> Vec<GoalEvent> {
    let current = match fixture.score() {
        Some(s) => s,
        None => return vec![],
    };

    let last = cache.get_or_init(fixture.id, current);
    let new_home = capped_increase(fixture, "home", last.home, current.home);
    let new_away = capped_increase(fixture, "away", last.away, current.away);

    let mut events = Vec::with_capacity(new_home.saturating_add(new_away) as usize);
    let mut running = Score::new(current.home.min(last.home), current.away.min(last.away));

    for _ in 0..new_home {
        running.home += 1;
        events.push(goal_event(fixture, Side::Home, running));
    }
    for _ in 0..new_away {
        running.away += 1;
        events.push(goal_event(fixture, Side::Away, running));
    }

    cache.update(fixture.id, current);
    events
}

fn capped_increase(fixture: &Fixture, side: &str, last: u32, current: u32) -> u32 {
    let increase = current.saturating_sub(last);
    if increase > MAX_GOALS_PER_POLL {
        warn!(
            "Fixture {} {} goals jumped {} -> {}; alerting at most {}",
            fixture.id, side, last, current, MAX_GOALS_PER_POLL
        );
        return MAX_GOALS_PER_POLL;
    }
    increase
}

fn goal_event(fixture: &Fixture, side: Side, score: Score) -> GoalEvent {
    GoalEvent {
        fixture_id: fixture.id,
        league: fixture.league.clone(),
        home_team: fixture.home_team.clone(),
        away_team: fixture.away_team.clone(),
        side,
        score,
        minute: fixture.minute,
    }
}
