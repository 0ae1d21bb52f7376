//! Deterministic notification id construction.
//!
//! Every rule and the live poller build ids through this module only. The id
//! is the dedup key: a rule never emits a candidate whose id is already in
//! the persisted list, so two templates must never produce the same string.
//!
//! | source              | template                                        |
//! |---------------------|-------------------------------------------------|
//! | appointment countdown | `appointment-<appointmentId>-<daysUntil>`     |
//! | journal gap         | `journal-reminder-<yyyy-mm-dd>`                 |
//! | weekly update       | `weekly-update-week-<n>`                        |
//! | live poller         | `appointment-now-<appointmentId>-<yyyy-mm-dd-HH-mm>` |
//!
//! `appointment-now-` cannot collide with `appointment-<uuid>-<n>` because
//! appointment ids are UUIDs and never start with `now-`.

use crate::model::source::AppointmentId;
use chrono::{NaiveDate, NaiveDateTime};

const DAY_FORMAT: &str = "%Y-%m-%d";
const MINUTE_FORMAT: &str = "%Y-%m-%d-%H-%M";

pub fn appointment_countdown(appointment_id: AppointmentId, days_until: i64) -> String {
    format!("appointment-{appointment_id}-{days_until}")
}

pub fn journal_reminder(day: NaiveDate) -> String {
    format!("journal-reminder-{}", day.format(DAY_FORMAT))
}

pub fn weekly_update(week: u32) -> String {
    format!("weekly-update-week-{week}")
}

pub fn appointment_now(appointment_id: AppointmentId, slot: NaiveDateTime) -> String {
    format!(
        "appointment-now-{appointment_id}-{}",
        slot.format(MINUTE_FORMAT)
    )
}

/// In-memory dedup key used by the live poller's fired set.
pub fn minute_bucket(appointment_id: AppointmentId, slot: NaiveDateTime) -> String {
    format!("{appointment_id}-{}", slot.format(MINUTE_FORMAT))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;
    use uuid::Uuid;

    fn fixed_id() -> AppointmentId {
        Uuid::parse_str("11111111-2222-4333-8444-555555555555").unwrap()
    }

    #[test]
    fn templates_render_expected_strings() {
        let day = NaiveDate::from_ymd_opt(2026, 3, 9).unwrap();
        let slot = day.and_time(NaiveTime::from_hms_opt(14, 5, 0).unwrap());

        assert_eq!(
            appointment_countdown(fixed_id(), 3),
            "appointment-11111111-2222-4333-8444-555555555555-3"
        );
        assert_eq!(journal_reminder(day), "journal-reminder-2026-03-09");
        assert_eq!(weekly_update(12), "weekly-update-week-12");
        assert_eq!(
            appointment_now(fixed_id(), slot),
            "appointment-now-11111111-2222-4333-8444-555555555555-2026-03-09-14-05"
        );
        assert_eq!(
            minute_bucket(fixed_id(), slot),
            "11111111-2222-4333-8444-555555555555-2026-03-09-14-05"
        );
    }
}
