//! Last-seen score per live fixture.
//!
//! The cache is the diff baseline for goal detection. It is owned by the
//! driver and only mutated between ticks, so it needs no locking.

use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::models::{FixtureId, Score};

#[derive(Debug, Default)]
pub struct SnapshotCache {
    scores: HashMap<FixtureId, Score>,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored score for `id`, or `current` when the fixture has not been seen
    /// yet. Nothing is stored until [`update`](Self::update) is called.
    pub fn get_or_init(&self, id: FixtureId, current: Score) -> Score {
        self.scores.get(&id).copied().unwrap_or(current)
    }

    pub fn update(&mut self, id: FixtureId, score: Score) {
        self.scores.insert(id, score);
    }

    /// Forget every fixture not in `still_live`. An empty set clears the cache.
    pub fn prune(&mut self, still_live: &HashSet<FixtureId>) {
        let before = self.scores.len();
        self.scores.retain(|id, _| still_live.contains(id));
        let removed = before - self.scores.len();
        if removed > 0 {
            debug!("SnapshotCache: pruned {} finished fixture(s)", removed);
        }
    }

    #[cfg(test)]
    pub fn get(&self, id: FixtureId) -> Option<Score> {
        self.scores.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}
