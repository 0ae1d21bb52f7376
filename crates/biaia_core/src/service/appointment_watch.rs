//! "Appointment starting now" detection for the live poller.
//!
//! # Invariants
//! - An appointment fires at most once per minute bucket while its key is
//!   remembered.
//! - Fired keys older than the retention window are pruned on every scan.
//! - The fired set lives in memory only; a restart forgets it.

use crate::config::NotificationConfig;
use crate::model::notification::{Notification, NotificationType, Timestamp};
use crate::model::notification_id;
use crate::model::source::Appointment;
use crate::service::clock::at_local;
use chrono::{Duration, NaiveDateTime, Timelike};
use log::warn;
use std::collections::HashMap;

const APPOINTMENT_NOW_TTL_DAYS: i64 = 1;

pub struct AppointmentWatch {
    fired: HashMap<String, Timestamp>,
    window: Duration,
    retention: Duration,
}

impl AppointmentWatch {
    pub fn new(config: &NotificationConfig) -> Self {
        Self {
            fired: HashMap::new(),
            window: config.match_window(),
            retention: config.fired_retention(),
        }
    }

    /// Returns one notification per appointment starting within the match
    /// window of `now` that has not fired in its minute bucket yet.
    pub fn scan(&mut self, now: Timestamp, appointments: &[Appointment]) -> Vec<Notification> {
        let retention = self.retention;
        self.fired
            .retain(|_, fired_at| now.signed_duration_since(*fired_at) <= retention);

        let today = now.date_naive();
        let mut matches = Vec::new();
        for appointment in appointments.iter().filter(|a| a.date == today) {
            let slot = minute_slot(appointment.scheduled_at());
            let starts_at = at_local(now, appointment.scheduled_at());
            if (starts_at - now).abs() > self.window {
                continue;
            }

            let key = notification_id::minute_bucket(appointment.id, slot);
            if self.fired.contains_key(&key) {
                continue;
            }

            match Notification::new(
                notification_id::appointment_now(appointment.id, slot),
                NotificationType::Appointment,
                "Appointment Now",
                format!("Your appointment \"{}\" is starting now", appointment.title),
                now,
                Some(now + Duration::days(APPOINTMENT_NOW_TTL_DAYS)),
            ) {
                Ok(notification) => {
                    self.fired.insert(key, now);
                    matches.push(notification);
                }
                Err(err) => warn!(
                    "event=appointment_now module=poller status=skip appointment_id={} error={}",
                    appointment.id, err
                ),
            }
        }
        matches
    }

    /// Number of remembered minute buckets.
    pub fn fired_len(&self) -> usize {
        self.fired.len()
    }
}

fn minute_slot(at: NaiveDateTime) -> NaiveDateTime {
    at.with_second(0)
        .and_then(|value| value.with_nanosecond(0))
        .unwrap_or(at)
}

#[cfg(test)]
mod tests {
    use super::AppointmentWatch;
    use crate::config::NotificationConfig;
    use crate::model::source::Appointment;
    use chrono::{DateTime, Duration, NaiveTime};

    #[test]
    fn fires_once_per_bucket_and_prunes_old_keys() {
        let now = DateTime::parse_from_rfc3339("2026-03-09T14:00:30+01:00").unwrap();
        let appointment = Appointment::new(
            "u1",
            "Ultrasound",
            now.date_naive(),
            NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
        );
        let mut watch = AppointmentWatch::new(&NotificationConfig::default());

        let fired = watch.scan(now, std::slice::from_ref(&appointment));
        assert_eq!(fired.len(), 1);
        assert!(fired[0].id.starts_with("appointment-now-"));
        assert!(fired[0].id.ends_with("-2026-03-09-14-00"));

        let again = watch.scan(now + Duration::seconds(20), std::slice::from_ref(&appointment));
        assert!(again.is_empty());
        assert_eq!(watch.fired_len(), 1);

        let later = watch.scan(now + Duration::minutes(6), std::slice::from_ref(&appointment));
        assert!(later.is_empty());
        assert_eq!(watch.fired_len(), 0);
    }

    #[test]
    fn ignores_other_days_and_times_outside_window() {
        let now = DateTime::parse_from_rfc3339("2026-03-09T14:00:30+00:00").unwrap();
        let tomorrow = Appointment::new(
            "u1",
            "Checkup",
            now.date_naive() + Duration::days(1),
            NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
        );
        let later_today = Appointment::new(
            "u1",
            "Lab",
            now.date_naive(),
            NaiveTime::from_hms_opt(14, 5, 0).unwrap(),
        );
        let mut watch = AppointmentWatch::new(&NotificationConfig::default());
        assert!(watch.scan(now, &[tomorrow, later_today]).is_empty());
    }
}
