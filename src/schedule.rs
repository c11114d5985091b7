use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::domain::TimerKey;

pub const TICK_CADENCE: Duration = Duration::from_secs(1);

/// One periodic registration per running timer. Anchors advance by whole
/// cadences so a late poll catches up without drifting.
#[derive(Debug, Clone)]
pub struct TickScheduler {
    cadence: Duration,
    registrations: HashMap<TimerKey, Instant>,
}

impl Default for TickScheduler {
    fn default() -> Self {
        Self::new(TICK_CADENCE)
    }
}

impl TickScheduler {
    pub fn new(cadence: Duration) -> Self {
        Self {
            cadence,
            registrations: HashMap::new(),
        }
    }

    pub fn arm(&mut self, key: TimerKey, now: Instant) {
        self.registrations.insert(key, now);
    }

    pub fn cancel(&mut self, key: TimerKey) -> bool {
        self.registrations.remove(&key).is_some()
    }

    #[cfg(test)]
    pub fn is_armed(&self, key: TimerKey) -> bool {
        self.registrations.contains_key(&key)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    /// Keys owed a tick at `now`, one entry per elapsed cadence. Entries for
    /// the same key are adjacent.
    pub fn due(&mut self, now: Instant) -> Vec<TimerKey> {
        let mut due = Vec::new();
        for (key, anchor) in self.registrations.iter_mut() {
            while now.saturating_duration_since(*anchor) >= self.cadence {
                *anchor += self.cadence;
                due.push(*key);
            }
        }

        due.sort();
        due
    }
}
