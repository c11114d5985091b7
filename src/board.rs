use std::sync::mpsc::Sender;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::domain::{DurationInput, TimerCollection, TimerError, TimerKey, TimerRecord};
use crate::schedule::TickScheduler;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerEvent {
    Finished { key: TimerKey, id: usize },
}

/// Keeps the timer collection and its tick registrations in step. Every
/// running timer has exactly one registration; everything else has none.
pub struct TimerBoard {
    timers: TimerCollection,
    scheduler: TickScheduler,
    events: Sender<TimerEvent>,
}

impl TimerBoard {
    pub fn new(default_duration: u32, events: Sender<TimerEvent>) -> Self {
        Self::with_parts(
            TimerCollection::new(default_duration),
            TickScheduler::default(),
            events,
        )
    }

    pub fn with_parts(
        timers: TimerCollection,
        scheduler: TickScheduler,
        events: Sender<TimerEvent>,
    ) -> Self {
        Self {
            timers,
            scheduler,
            events,
        }
    }

    pub fn timers(&self) -> &TimerCollection {
        &self.timers
    }

    #[cfg(test)]
    pub fn armed_count(&self) -> usize {
        self.scheduler.len()
    }

    pub fn add(&mut self) -> Result<usize, TimerError> {
        match self.timers.add_timer() {
            Ok(id) => {
                info!(id, total = self.timers.len(), "timer added");
                Ok(id)
            }
            Err(err) => {
                warn!(%err, "timer not added");
                Err(err)
            }
        }
    }

    pub fn remove(&mut self, id: usize) -> Result<TimerRecord, TimerError> {
        let removed = self.timers.remove_timer(id)?;
        self.scheduler.cancel(removed.key);
        info!(id, key = %removed.key, remaining = self.timers.len(), "timer removed");
        Ok(removed)
    }

    pub fn select(&mut self, id: usize) -> bool {
        self.timers.select_visible(id)
    }

    pub fn select_next(&mut self) -> Option<usize> {
        self.timers.select_next()
    }

    pub fn select_previous(&mut self) -> Option<usize> {
        self.timers.select_previous()
    }

    /// Starts or pauses timer `id`, returning whether it is now running.
    pub fn toggle(&mut self, id: usize, now: Instant) -> Result<bool, TimerError> {
        let key = self.key(id)?;
        let running = self.timers.replace(key, TimerRecord::toggled)?.is_running;
        if running {
            self.scheduler.arm(key, now);
        } else {
            self.scheduler.cancel(key);
        }
        info!(id, running, "timer toggled");
        Ok(running)
    }

    pub fn reset(&mut self, id: usize) -> Result<(), TimerError> {
        let key = self.key(id)?;
        self.timers.replace(key, TimerRecord::reset)?;
        self.scheduler.cancel(key);
        info!(id, "timer reset");
        Ok(())
    }

    /// Validates `input` and applies it as the new duration of timer `id`.
    /// Invalid input leaves the timer untouched.
    pub fn edit(&mut self, id: usize, input: DurationInput) -> Result<u32, TimerError> {
        let key = self.key(id)?;
        let duration = match input.total_seconds() {
            Ok(duration) => duration,
            Err(err) => {
                warn!(id, minutes = input.minutes, seconds = input.seconds, "rejected duration");
                return Err(err);
            }
        };

        self.timers.replace(key, |timer| timer.edited(duration))?;
        self.scheduler.cancel(key);
        info!(id, duration, "timer edited");
        Ok(duration)
    }

    /// Applies every tick owed at `now` and reports completions on the event
    /// channel. Returns the number of ticks that changed a live timer.
    pub fn advance(&mut self, now: Instant) -> usize {
        let mut applied = 0;
        for key in self.scheduler.due(now) {
            let Some(timer) = self.timers.get_by_key(key) else {
                debug!(err = %TimerError::StaleTimer(key), "dropping tick");
                self.scheduler.cancel(key);
                continue;
            };

            // ticks queued behind one that stopped this timer in the same batch
            if !timer.is_running {
                self.scheduler.cancel(key);
                continue;
            }

            let (next, finished) = timer.ticked();
            let still_running = next.is_running;
            if let Err(err) = self.timers.replace(key, |_| next) {
                debug!(%err, "dropping tick");
                self.scheduler.cancel(key);
                continue;
            }

            applied += 1;
            if !still_running {
                self.scheduler.cancel(key);
            }

            if finished {
                let id = self.timers.id_of(key).unwrap_or_default();
                info!(id, %key, "timer finished");
                if self.events.send(TimerEvent::Finished { key, id }).is_err() {
                    warn!(id, "no listener for timer completion");
                }
            }
        }
        applied
    }

    fn key(&self, id: usize) -> Result<TimerKey, TimerError> {
        self.timers.key_of(id).ok_or(TimerError::UnknownTimer(id))
    }
}
