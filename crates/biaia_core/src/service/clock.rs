//! Wall-clock source injected into the notification center.

use crate::model::notification::Timestamp;
use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime};
use std::sync::Mutex;

pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Local time of the host, with its current UTC offset.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Local::now().fixed_offset()
    }
}

/// Manually driven clock for tests and replays.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<Timestamp>,
}

impl FixedClock {
    pub fn new(now: Timestamp) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: Timestamp) {
        if let Ok(mut current) = self.now.lock() {
            *current = now;
        }
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut current) = self.now.lock() {
            *current = *current + by;
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        match self.now.lock() {
            Ok(current) => *current,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

/// Interprets a local wall-clock value in the offset of `reference`.
///
/// The offset is fixed: a wall-clock value on the far side of a DST switch
/// still resolves with `reference`'s offset, so it lands one hour off the
/// zone's true instant. Day counts and minute matching are computed in that
/// single offset, which keeps them consistent with each other.
pub fn at_local(reference: Timestamp, local: NaiveDateTime) -> Timestamp {
    let offset = *reference.offset();
    let utc = local - Duration::seconds(i64::from(offset.local_minus_utc()));
    DateTime::from_naive_utc_and_offset(utc, offset)
}

/// Local midnight starting `day`, in the offset of `reference`.
pub fn start_of_day(reference: Timestamp, day: NaiveDate) -> Timestamp {
    at_local(reference, day.and_time(NaiveTime::MIN))
}

#[cfg(test)]
mod tests {
    use super::{at_local, start_of_day, Clock, FixedClock};
    use chrono::{DateTime, Duration, NaiveDate};

    #[test]
    fn start_of_day_keeps_reference_offset() {
        let now = DateTime::parse_from_rfc3339("2026-03-09T10:30:00+02:00").unwrap();
        let midnight = start_of_day(now, NaiveDate::from_ymd_opt(2026, 3, 10).unwrap());
        assert_eq!(midnight.to_rfc3339(), "2026-03-10T00:00:00+02:00");
        assert_eq!(at_local(now, now.naive_local()), now);
    }

    #[test]
    fn at_local_ignores_offset_changes_on_other_days() {
        // Reference is winter time; the target day is after the spring switch.
        let now = DateTime::parse_from_rfc3339("2026-03-27T12:00:00+01:00").unwrap();
        let after_switch = NaiveDate::from_ymd_opt(2026, 3, 30)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let resolved = at_local(now, after_switch);
        assert_eq!(resolved.to_rfc3339(), "2026-03-30T09:00:00+01:00");
        assert_eq!((start_of_day(now, after_switch.date()) - now).num_days(), 2);
    }

    #[test]
    fn fixed_clock_advances() {
        let start = DateTime::parse_from_rfc3339("2026-03-09T10:30:00+00:00").unwrap();
        let clock = FixedClock::new(start);
        clock.advance(Duration::minutes(5));
        assert_eq!(clock.now(), start + Duration::minutes(5));
    }
}
