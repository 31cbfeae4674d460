use std::sync::{Arc, Mutex, PoisonError};

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use uuid::Uuid;

/// Completion timestamps are stored as server-local wall-clock text in this
/// fixed-width layout so that string comparison orders them chronologically.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

pub fn format_timestamp(at: NaiveDateTime) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT).ok()
}

/// `[midnight, next midnight)` of the given local calendar day.
pub fn day_bounds(day: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
    let start = day.and_time(NaiveTime::MIN);
    (start, start + TimeDelta::days(1))
}

/// Source of "now" in the server's local time zone.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> NaiveDateTime {
        (**self).now()
    }
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock that only moves when told to.
pub struct ManualClock {
    now: Mutex<NaiveDateTime>,
}

impl ManualClock {
    pub fn new(now: NaiveDateTime) -> Self {
        Self { now: Mutex::new(now) }
    }

    pub fn set(&self, now: NaiveDateTime) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = now;
    }

    pub fn advance(&self, by: TimeDelta) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Issues globally unique identifiers for users, quests and problems.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> Uuid;
}

pub struct RandomIds;

impl IdGenerator for RandomIds {
    fn next_id(&self) -> Uuid {
        Uuid::new_v4()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn formatted_timestamps_sort_chronologically() {
        let early = format_timestamp(at("2026-10-16 23:59:59"));
        let midnight = format_timestamp(at("2026-10-17 00:00:00"));
        let later = format_timestamp(at("2026-10-17 09:30:00"));
        assert!(early < midnight);
        assert!(midnight < later);
    }

    #[test]
    fn timestamp_parses_back() {
        let t = at("2026-10-17 12:34:56") + TimeDelta::microseconds(789);
        assert_eq!(parse_timestamp(&format_timestamp(t)), Some(t));
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn day_bounds_span_midnight_to_midnight() {
        let day = NaiveDate::from_ymd_opt(2026, 10, 17).unwrap();
        let (start, end) = day_bounds(day);
        assert_eq!(start, at("2026-10-17 00:00:00"));
        assert_eq!(end, at("2026-10-18 00:00:00"));
    }

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::new(at("2026-10-17 08:00:00"));
        clock.advance(TimeDelta::hours(2));
        assert_eq!(clock.now(), at("2026-10-17 10:00:00"));
        clock.set(at("2026-01-01 00:00:00"));
        assert_eq!(clock.now(), at("2026-01-01 00:00:00"));
    }

    #[test]
    fn manual_clock_keeps_working_after_a_panic_while_locked() {
        let clock = Arc::new(ManualClock::new(at("2026-10-17 08:00:00")));
        let holder = Arc::clone(&clock);
        let joined = std::thread::spawn(move || {
            let _guard = holder.now.lock().unwrap();
            panic!("panicked while holding the clock");
        })
        .join();
        assert!(joined.is_err());
        assert!(clock.now.is_poisoned());

        clock.advance(TimeDelta::hours(1));
        assert_eq!(clock.now(), at("2026-10-17 09:00:00"));
        clock.set(at("2026-10-18 00:00:00"));
        assert_eq!(clock.now(), at("2026-10-18 00:00:00"));
    }
}
