//! Rule evaluator: derives candidate notifications from source aggregates.
//!
//! # Responsibility
//! - Appointment countdown, journal gap and weekly pregnancy update rules.
//!
//! # Invariants
//! - Pure: inputs are never mutated, only new candidates are returned.
//! - A candidate is never emitted when its id already exists in `existing`,
//!   read or unread. This is the only dedup at this layer.
//! - Day and week differences truncate toward zero.

use crate::config::NotificationConfig;
use crate::model::notification::{Notification, NotificationType, Timestamp};
use crate::model::notification_id;
use crate::model::source::{Appointment, SourceSnapshot};
use crate::service::clock::start_of_day;
use chrono::{Duration, NaiveDate};
use log::warn;
use std::collections::HashSet;

pub const PREGNANCY_WEEKS: i64 = 40;

/// Evaluates every rule against one snapshot.
pub fn evaluate(
    now: Timestamp,
    snapshot: &SourceSnapshot,
    existing: &[Notification],
    config: &NotificationConfig,
) -> Vec<Notification> {
    let mut seen: HashSet<String> = existing.iter().map(|n| n.id.clone()).collect();
    let mut candidates = Vec::new();

    for appointment in &snapshot.appointments {
        if let Some(candidate) = appointment_countdown(now, appointment, config) {
            push_unseen(&mut seen, &mut candidates, candidate);
        }
    }

    if let Some(candidate) = journal_gap(now, snapshot.last_journal_date, config) {
        push_unseen(&mut seen, &mut candidates, candidate);
    }

    if let Some(profile) = &snapshot.profile {
        if let Some(candidate) = weekly_update(now, profile.due_date, config) {
            push_unseen(&mut seen, &mut candidates, candidate);
        }
    }

    candidates
}

/// Whole days from `now` until the start of the appointment day.
///
/// An appointment 1.9 days away counts as 1 day.
pub fn days_until(now: Timestamp, appointment_day: NaiveDate) -> i64 {
    (start_of_day(now, appointment_day) - now).num_days()
}

/// Current pregnancy week, clamped to `1..=40`.
///
/// The distance to the due date is unsigned, so a due date three weeks in
/// the past reads as week 37.
pub fn pregnancy_week(due_date: NaiveDate, now: Timestamp) -> u32 {
    let weeks_left = (start_of_day(now, due_date) - now).num_weeks().abs();
    let week = (PREGNANCY_WEEKS - weeks_left).clamp(1, PREGNANCY_WEEKS);
    u32::try_from(week).unwrap_or(1)
}

fn appointment_countdown(
    now: Timestamp,
    appointment: &Appointment,
    config: &NotificationConfig,
) -> Option<Notification> {
    let days = days_until(now, appointment.date);
    if !config.countdown_days.contains(&days) {
        return None;
    }

    let plural = if days == 1 { "" } else { "s" };
    build(
        notification_id::appointment_countdown(appointment.id, days),
        NotificationType::Appointment,
        "Upcoming Appointment",
        format!(
            "You have \"{}\" in {days} day{plural}",
            appointment.title
        ),
        now,
        Some(start_of_day(now, appointment.date)),
    )
}

fn journal_gap(
    now: Timestamp,
    last_journal_date: Option<NaiveDate>,
    config: &NotificationConfig,
) -> Option<Notification> {
    let overdue = match last_journal_date {
        None => true,
        Some(day) => (now - start_of_day(now, day)).num_days() >= 1,
    };
    if !overdue {
        return None;
    }

    build(
        notification_id::journal_reminder(now.date_naive()),
        NotificationType::Reminder,
        "Journal Reminder",
        "Don't forget to log your symptoms and mood today",
        now,
        Some(now + Duration::days(config.journal_reminder_ttl_days)),
    )
}

fn weekly_update(
    now: Timestamp,
    due_date: NaiveDate,
    config: &NotificationConfig,
) -> Option<Notification> {
    let week = pregnancy_week(due_date, now);
    build(
        notification_id::weekly_update(week),
        NotificationType::Tip,
        "Weekly Pregnancy Update",
        format!("Week {week}: Your baby is continuing to develop!"),
        now,
        Some(now + Duration::days(config.weekly_update_ttl_days)),
    )
}

fn build(
    id: String,
    kind: NotificationType,
    title: &str,
    description: impl Into<String>,
    now: Timestamp,
    expires_at: Option<Timestamp>,
) -> Option<Notification> {
    match Notification::new(id, kind, title, description, now, expires_at) {
        Ok(notification) => Some(notification),
        Err(err) => {
            warn!(
                "event=rule_candidate module=rules status=skip kind={} error={}",
                kind.as_str(),
                err
            );
            None
        }
    }
}

fn push_unseen(
    seen: &mut HashSet<String>,
    candidates: &mut Vec<Notification>,
    candidate: Notification,
) {
    if seen.insert(candidate.id.clone()) {
        candidates.push(candidate);
    }
}
