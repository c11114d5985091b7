use std::fmt::{Display, Formatter};

pub const MAX_TIMERS: usize = 5;
pub const DEFAULT_DURATION_SECONDS: u32 = 60;
/// Upper bound for each of the minutes and seconds fields of an edit.
pub const MAX_DURATION_COMPONENT: i64 = 60;
pub const MAX_DURATION_SECONDS: u32 = (MAX_DURATION_COMPONENT * 60 + MAX_DURATION_COMPONENT) as u32;

/// Stable identity of a timer. Never reused within one collection, unlike the
/// positional display number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerKey(u64);

impl Display for TimerKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerError {
    CapacityExceeded,
    InvalidDuration { minutes: i64, seconds: i64 },
    UnknownTimer(usize),
    StaleTimer(TimerKey),
}

impl Display for TimerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TimerError::CapacityExceeded => write!(f, "Max five timers allowed"),
            TimerError::InvalidDuration { .. } => write!(f, "Please enter a valid time."),
            TimerError::UnknownTimer(id) => write!(f, "timer {id} does not exist"),
            TimerError::StaleTimer(key) => write!(f, "timer {key} is no longer live"),
        }
    }
}

impl std::error::Error for TimerError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerPhase {
    Idle,
    Running,
    Finished,
}

impl TimerPhase {
    pub fn label(self) -> &'static str {
        match self {
            TimerPhase::Idle => "paused",
            TimerPhase::Running => "running",
            TimerPhase::Finished => "finished",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerRecord {
    pub key: TimerKey,
    pub time_left: u32,
    pub input_time: u32,
    pub is_running: bool,
}

impl TimerRecord {
    pub fn new(key: TimerKey, duration: u32) -> Self {
        Self {
            key,
            time_left: duration,
            input_time: duration,
            is_running: false,
        }
    }

    pub fn phase(&self) -> TimerPhase {
        if self.is_running {
            TimerPhase::Running
        } else if self.time_left == 0 {
            TimerPhase::Finished
        } else {
            TimerPhase::Idle
        }
    }

    /// Flips between running and paused. A finished timer rewinds to its
    /// configured duration before it starts again, rather than starting at
    /// zero and immediately finishing a second time.
    pub fn toggled(&self) -> Self {
        if !self.is_running && self.time_left == 0 {
            return Self {
                time_left: self.input_time,
                is_running: true,
                ..self.clone()
            };
        }

        Self {
            is_running: !self.is_running,
            ..self.clone()
        }
    }

    /// Applies one elapsed second. The boolean is true only for the tick that
    /// brings the countdown to zero.
    pub fn ticked(&self) -> (Self, bool) {
        if !self.is_running {
            return (self.clone(), false);
        }

        if self.time_left == 0 {
            return (
                Self {
                    is_running: false,
                    ..self.clone()
                },
                false,
            );
        }

        let time_left = self.time_left - 1;
        let finished = time_left == 0;
        (
            Self {
                time_left,
                is_running: !finished,
                ..self.clone()
            },
            finished,
        )
    }

    pub fn reset(&self) -> Self {
        Self {
            time_left: self.input_time,
            is_running: false,
            ..self.clone()
        }
    }

    pub fn edited(&self, duration: u32) -> Self {
        Self {
            time_left: duration,
            input_time: duration,
            is_running: false,
            ..self.clone()
        }
    }
}

/// Raw minutes/seconds as typed into the edit dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DurationInput {
    pub minutes: i64,
    pub seconds: i64,
}

impl DurationInput {
    pub fn new(minutes: i64, seconds: i64) -> Self {
        Self { minutes, seconds }
    }

    /// Reads each field like a leading-integer parse: `"12abc"` is 12 and
    /// anything without leading digits is 0.
    pub fn parse(minutes: &str, seconds: &str) -> Self {
        Self {
            minutes: parse_leading_integer(minutes),
            seconds: parse_leading_integer(seconds),
        }
    }

    /// Accepts `MM:SS`, or a bare number of seconds which is folded into
    /// minutes (`"90"` is 1:30). `MM:SS` is range-checked like the dialog.
    pub fn parse_clock(raw: &str) -> Result<Self, String> {
        let raw = raw.trim();
        let Some((minutes, seconds)) = raw.split_once(':') else {
            let seconds = raw
                .parse::<i64>()
                .map_err(|_| format!("invalid seconds in '{raw}', expected MM:SS"))?;
            return Ok(Self::new(seconds.div_euclid(60), seconds.rem_euclid(60)));
        };

        let minutes = minutes
            .trim()
            .parse::<i64>()
            .map_err(|_| format!("invalid minutes in '{raw}', expected MM:SS"))?;
        let seconds = seconds
            .trim()
            .parse::<i64>()
            .map_err(|_| format!("invalid seconds in '{raw}', expected MM:SS"))?;

        Ok(Self::new(minutes, seconds))
    }

    pub fn total_seconds(&self) -> Result<u32, TimerError> {
        let in_range = |value: i64| (0..=MAX_DURATION_COMPONENT).contains(&value);
        if !in_range(self.minutes) || !in_range(self.seconds) {
            return Err(self.invalid());
        }

        let total = self.minutes * 60 + self.seconds;
        if total <= 0 {
            return Err(self.invalid());
        }

        u32::try_from(total).map_err(|_| self.invalid())
    }

    fn invalid(&self) -> TimerError {
        TimerError::InvalidDuration {
            minutes: self.minutes,
            seconds: self.seconds,
        }
    }
}

fn parse_leading_integer(raw: &str) -> i64 {
    let trimmed = raw.trim_start();
    let (negative, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };

    let mut value: i64 = 0;
    for digit in digits.chars().map_while(|c| c.to_digit(10)) {
        value = value.saturating_mul(10).saturating_add(i64::from(digit));
    }

    if negative { -value } else { value }
}

/// The bounded, ordered set of live timers plus the single visible-timer
/// selection. Display ids are positions (1-based) and shift on removal; keys
/// do not.
#[derive(Debug, Clone)]
pub struct TimerCollection {
    timers: Vec<TimerRecord>,
    visible: Option<TimerKey>,
    next_key: u64,
    default_duration: u32,
}

impl Default for TimerCollection {
    fn default() -> Self {
        Self::new(DEFAULT_DURATION_SECONDS)
    }
}

impl TimerCollection {
    pub fn new(default_duration: u32) -> Self {
        Self {
            timers: Vec::new(),
            visible: None,
            next_key: 1,
            default_duration: default_duration.clamp(1, MAX_DURATION_SECONDS),
        }
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.timers.len() >= MAX_TIMERS
    }

    pub fn default_duration(&self) -> u32 {
        self.default_duration
    }

    /// Display id the next added timer will receive.
    pub fn next_id(&self) -> usize {
        (self.timers.len() + 1).min(MAX_TIMERS)
    }

    /// Records paired with their display ids, in display order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &TimerRecord)> {
        self.timers
            .iter()
            .enumerate()
            .map(|(index, timer)| (index + 1, timer))
    }

    #[cfg(test)]
    pub fn ids(&self) -> Vec<usize> {
        (1..=self.timers.len()).collect()
    }

    pub fn get(&self, id: usize) -> Option<&TimerRecord> {
        id.checked_sub(1).and_then(|index| self.timers.get(index))
    }

    pub fn get_by_key(&self, key: TimerKey) -> Option<&TimerRecord> {
        self.timers.iter().find(|timer| timer.key == key)
    }

    pub fn id_of(&self, key: TimerKey) -> Option<usize> {
        self.timers
            .iter()
            .position(|timer| timer.key == key)
            .map(|index| index + 1)
    }

    pub fn key_of(&self, id: usize) -> Option<TimerKey> {
        self.get(id).map(|timer| timer.key)
    }

    pub fn visible_key(&self) -> Option<TimerKey> {
        self.visible
    }

    pub fn visible_id(&self) -> Option<usize> {
        self.visible.and_then(|key| self.id_of(key))
    }

    pub fn visible(&self) -> Option<&TimerRecord> {
        self.visible.and_then(|key| self.get_by_key(key))
    }

    pub fn add_timer(&mut self) -> Result<usize, TimerError> {
        if self.is_full() {
            return Err(TimerError::CapacityExceeded);
        }

        let key = TimerKey(self.next_key);
        self.next_key += 1;
        self.timers.push(TimerRecord::new(key, self.default_duration));
        self.visible = Some(key);
        Ok(self.timers.len())
    }

    /// Removes the timer shown as `id`. Survivors are renumbered by position;
    /// if the removed timer was visible the first survivor becomes visible.
    pub fn remove_timer(&mut self, id: usize) -> Result<TimerRecord, TimerError> {
        if self.get(id).is_none() {
            return Err(TimerError::UnknownTimer(id));
        }

        let removed = self.timers.remove(id - 1);
        if self.visible == Some(removed.key) {
            self.visible = self.timers.first().map(|timer| timer.key);
        }

        Ok(removed)
    }

    pub fn select_visible(&mut self, id: usize) -> bool {
        match self.key_of(id) {
            Some(key) => {
                self.visible = Some(key);
                true
            }
            None => false,
        }
    }

    pub fn select_next(&mut self) -> Option<usize> {
        self.step_visible(1)
    }

    pub fn select_previous(&mut self) -> Option<usize> {
        self.step_visible(-1)
    }

    fn step_visible(&mut self, delta: isize) -> Option<usize> {
        if self.timers.is_empty() {
            return None;
        }

        let count = self.timers.len() as isize;
        let current = self.visible_id().map(|id| id as isize - 1).unwrap_or(0);
        let next = (current + delta).rem_euclid(count) as usize;
        self.visible = Some(self.timers[next].key);
        Some(next + 1)
    }

    /// Replaces the record for `key` with `update(record)` as a whole value.
    pub fn replace<F>(&mut self, key: TimerKey, update: F) -> Result<&TimerRecord, TimerError>
    where
        F: FnOnce(&TimerRecord) -> TimerRecord,
    {
        let index = self
            .timers
            .iter()
            .position(|timer| timer.key == key)
            .ok_or(TimerError::StaleTimer(key))?;

        let next = update(&self.timers[index]);
        self.timers[index] = TimerRecord { key, ..next };
        Ok(&self.timers[index])
    }
}

pub fn format_time(seconds: u32) -> String {
    let minutes = seconds / 60;
    let seconds = seconds % 60;
    format!("{minutes:02}:{seconds:02}")
}

#[cfg(test)]
mod tests {
    use super::{
        DurationInput, MAX_TIMERS, TimerCollection, TimerError, TimerPhase, TimerRecord, format_time,
    };

    fn running(collection: &mut TimerCollection, id: usize) -> TimerRecord {
        let key = collection.key_of(id).expect("timer should exist");
        collection
            .replace(key, TimerRecord::toggled)
            .expect("toggle should work")
            .clone()
    }

    #[test]
    fn sixth_timer_is_rejected_without_mutation() {
        let mut timers = TimerCollection::default();
        for expected in 1..=MAX_TIMERS {
            assert_eq!(timers.add_timer(), Ok(expected));
        }
        let visible_before = timers.visible_id();

        assert_eq!(timers.add_timer(), Err(TimerError::CapacityExceeded));
        assert_eq!(timers.len(), MAX_TIMERS);
        assert_eq!(timers.visible_id(), visible_before);
        assert_eq!(timers.next_id(), MAX_TIMERS);
    }

    #[test]
    fn ids_stay_contiguous_after_removals() {
        let mut timers = TimerCollection::default();
        for _ in 0..MAX_TIMERS {
            timers.add_timer().expect("add should work");
        }

        timers.remove_timer(2).expect("remove should work");
        timers.remove_timer(4).expect("remove should work");
        assert_eq!(timers.ids(), vec![1, 2, 3]);
        assert_eq!(timers.next_id(), 4);

        timers.add_timer().expect("add should work");
        assert_eq!(timers.ids(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn removing_only_timer_resets_next_id() {
        let mut timers = TimerCollection::default();
        timers.add_timer().expect("add should work");
        timers.remove_timer(1).expect("remove should work");

        assert!(timers.is_empty());
        assert_eq!(timers.next_id(), 1);
        assert_eq!(timers.visible_id(), None);
    }

    #[test]
    fn removing_first_renumbers_second() {
        let mut timers = TimerCollection::default();
        timers.add_timer().expect("add A");
        timers.add_timer().expect("add B");
        let b = timers.key_of(2).expect("B exists");
        assert_eq!(timers.visible_key(), Some(b));

        timers.remove_timer(1).expect("remove A");
        assert_eq!(timers.id_of(b), Some(1));
        assert_eq!(timers.next_id(), 2);
        assert_eq!(timers.visible_id(), Some(1));
        assert_eq!(timers.visible_key(), Some(b));
    }

    #[test]
    fn non_visible_removal_keeps_same_record_visible() {
        let mut timers = TimerCollection::default();
        for _ in 0..3 {
            timers.add_timer().expect("add should work");
        }
        let third = timers.key_of(3).expect("third exists");
        assert_eq!(timers.visible_id(), Some(3));

        // second-to-last goes away; the visible record shifts from 3 to 2
        timers.remove_timer(2).expect("remove should work");
        assert_eq!(timers.visible_key(), Some(third));
        assert_eq!(timers.visible_id(), Some(2));
    }

    #[test]
    fn removing_visible_selects_first_survivor() {
        let mut timers = TimerCollection::default();
        for _ in 0..3 {
            timers.add_timer().expect("add should work");
        }
        let first = timers.key_of(1).expect("first exists");

        timers.remove_timer(3).expect("remove should work");
        assert_eq!(timers.visible_key(), Some(first));
        assert_eq!(timers.visible_id(), Some(1));
    }

    #[test]
    fn unknown_ids_are_ignored() {
        let mut timers = TimerCollection::default();
        timers.add_timer().expect("add should work");

        assert_eq!(timers.remove_timer(4), Err(TimerError::UnknownTimer(4)));
        assert_eq!(timers.remove_timer(0), Err(TimerError::UnknownTimer(0)));
        assert!(!timers.select_visible(2));
        assert_eq!(timers.len(), 1);
    }

    #[test]
    fn stale_key_cannot_be_updated() {
        let mut timers = TimerCollection::default();
        timers.add_timer().expect("add should work");
        let key = timers.key_of(1).expect("timer exists");
        timers.remove_timer(1).expect("remove should work");
        timers.add_timer().expect("add should work");

        assert_eq!(
            timers.replace(key, TimerRecord::toggled).map(|_| ()),
            Err(TimerError::StaleTimer(key))
        );
        assert!(!timers.get(1).expect("new timer").is_running);
    }

    #[test]
    fn paging_wraps_around() {
        let mut timers = TimerCollection::default();
        for _ in 0..3 {
            timers.add_timer().expect("add should work");
        }

        assert_eq!(timers.select_next(), Some(1));
        assert_eq!(timers.select_previous(), Some(3));
        assert_eq!(timers.select_previous(), Some(2));
    }

    #[test]
    fn countdown_finishes_once() {
        let mut timers = TimerCollection::new(3);
        timers.add_timer().expect("add should work");
        let key = running(&mut timers, 1).key;

        let mut completions = 0;
        for _ in 0..5 {
            let (next, finished) = timers.get(1).expect("timer").ticked();
            timers.replace(key, |_| next).expect("replace should work");
            if finished {
                completions += 1;
            }
        }

        let timer = timers.get(1).expect("timer");
        assert_eq!(timer.time_left, 0);
        assert!(!timer.is_running);
        assert_eq!(timer.phase(), TimerPhase::Finished);
        assert_eq!(completions, 1);
    }

    #[test]
    fn paused_timer_does_not_tick() {
        let mut timers = TimerCollection::default();
        timers.add_timer().expect("add should work");
        let timer = running(&mut timers, 1);
        let timer = TimerRecord {
            time_left: 30,
            ..timer
        }
        .toggled();

        let (after, finished) = timer.ticked();
        assert_eq!(after.time_left, 30);
        assert!(!finished);
        assert_eq!(after.phase(), TimerPhase::Idle);
    }

    #[test]
    fn toggling_finished_timer_rewinds() {
        let mut timers = TimerCollection::new(1);
        timers.add_timer().expect("add should work");
        let timer = running(&mut timers, 1);
        let (finished, _) = timer.ticked();
        assert_eq!(finished.phase(), TimerPhase::Finished);

        let restarted = finished.toggled();
        assert!(restarted.is_running);
        assert_eq!(restarted.time_left, 1);
    }

    #[test]
    fn reset_is_idempotent() {
        let mut timers = TimerCollection::default();
        timers.add_timer().expect("add should work");
        let timer = running(&mut timers, 1);
        let (timer, _) = timer.ticked();

        let once = timer.reset();
        let twice = once.reset();
        assert_eq!(once, twice);
        assert_eq!(once.time_left, once.input_time);
        assert!(!once.is_running);
    }

    #[test]
    fn edit_validates_each_component() {
        assert_eq!(DurationInput::new(5, 0).total_seconds(), Ok(300));
        assert_eq!(DurationInput::new(60, 60).total_seconds(), Ok(3660));
        assert!(matches!(
            DurationInput::new(61, 0).total_seconds(),
            Err(TimerError::InvalidDuration { minutes: 61, .. })
        ));
        assert!(DurationInput::new(0, 0).total_seconds().is_err());
        assert!(DurationInput::new(0, 61).total_seconds().is_err());
        assert!(DurationInput::new(-1, 30).total_seconds().is_err());
    }

    #[test]
    fn edit_replaces_duration_and_stops() {
        let mut timers = TimerCollection::default();
        timers.add_timer().expect("add should work");
        let timer = running(&mut timers, 1);

        let edited = timer.edited(300);
        assert_eq!(edited.input_time, 300);
        assert_eq!(edited.time_left, 300);
        assert!(!edited.is_running);
    }

    #[test]
    fn dialog_fields_parse_leniently() {
        assert_eq!(DurationInput::parse("5", ""), DurationInput::new(5, 0));
        assert_eq!(DurationInput::parse(" 12abc", "x"), DurationInput::new(12, 0));
        assert_eq!(DurationInput::parse("-3", "+7"), DurationInput::new(-3, 7));
    }

    #[test]
    fn clock_arguments() {
        assert_eq!(DurationInput::parse_clock("05:00"), Ok(DurationInput::new(5, 0)));
        assert_eq!(DurationInput::parse_clock("90"), Ok(DurationInput::new(1, 30)));
        assert_eq!(DurationInput::parse_clock("0:90"), Ok(DurationInput::new(0, 90)));
        assert!(DurationInput::parse_clock("0:90").expect("parses").total_seconds().is_err());
        assert!(DurationInput::parse_clock("ab:00").is_err());
    }

    #[test]
    fn formats_minutes_and_seconds() {
        assert_eq!(format_time(0), "00:00");
        assert_eq!(format_time(65), "01:05");
        assert_eq!(format_time(3660), "61:00");
    }
}
