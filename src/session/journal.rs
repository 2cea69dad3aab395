//! Outbound history of a session, readable without the session lock.
//!
//! A move that waits on a player request keeps the session locked for the
//! whole request window. Reconnecting players still need the room history
//! and their last state during that window, so both live here, behind a
//! plain mutex shared by the session and its registry handle.

use std::collections::VecDeque;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::core::PlayerId;

#[derive(Debug, Default)]
struct Entries {
    events: VecDeque<Value>,
    states: FxHashMap<PlayerId, Value>,
}

/// Bounded broadcast log plus the last state pushed to each player.
#[derive(Debug)]
pub struct Journal {
    limit: usize,
    entries: Mutex<Entries>,
}

impl Journal {
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self::restore(limit, VecDeque::new())
    }

    /// Journal seeded with broadcasts kept in a snapshot.
    #[must_use]
    pub fn restore(limit: usize, mut events: VecDeque<Value>) -> Self {
        while events.len() > limit {
            events.pop_front();
        }
        Self {
            limit,
            entries: Mutex::new(Entries {
                events,
                states: FxHashMap::default(),
            }),
        }
    }

    /// Keep a broadcast, dropping the oldest one past the limit.
    pub fn record(&self, message: Value) {
        let mut entries = self.entries.lock();
        entries.events.push_back(message);
        while entries.events.len() > self.limit {
            entries.events.pop_front();
        }
    }

    /// Kept broadcasts, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<Value> {
        self.entries.lock().events.iter().cloned().collect()
    }

    pub fn set_state(&self, player: PlayerId, state: Value) {
        self.entries.lock().states.insert(player, state);
    }

    /// Last state pushed to `player`.
    #[must_use]
    pub fn state(&self, player: PlayerId) -> Option<Value> {
        self.entries.lock().states.get(&player).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_record_keeps_newest() {
        let journal = Journal::new(2);
        for n in 0..3 {
            journal.record(json!({ "n": n }));
        }
        assert_eq!(journal.events(), vec![json!({ "n": 1 }), json!({ "n": 2 })]);
    }

    #[test]
    fn test_restore_trims_to_limit() {
        let events: VecDeque<Value> = (0..4).map(|n| json!({ "n": n })).collect();
        let journal = Journal::restore(1, events);
        assert_eq!(journal.events(), vec![json!({ "n": 3 })]);
    }

    #[test]
    fn test_state_is_per_player() {
        let journal = Journal::new(4);
        journal.set_state(PlayerId(1), json!({ "turn_number": 1 }));
        journal.set_state(PlayerId(1), json!({ "turn_number": 2 }));

        assert_eq!(journal.state(PlayerId(1)), Some(json!({ "turn_number": 2 })));
        assert_eq!(journal.state(PlayerId(2)), None);
    }
}
