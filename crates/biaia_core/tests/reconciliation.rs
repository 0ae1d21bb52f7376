use biaia_core::{
    reconcile, Appointment, Notification, NotificationConfig, NotificationType, SourceSnapshot,
    Timestamp,
};
use chrono::{DateTime, Duration, NaiveTime};

fn now() -> Timestamp {
    DateTime::parse_from_rfc3339("2026-03-09T09:00:00+00:00").unwrap()
}

fn snapshot() -> SourceSnapshot {
    SourceSnapshot {
        appointments: vec![Appointment::new(
            "u1",
            "Ultrasound",
            now().date_naive() + Duration::days(4),
            NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
        )],
        profile: None,
        last_journal_date: None,
    }
}

fn message(id: &str, date: Timestamp, expires_at: Option<Timestamp>) -> Notification {
    Notification::new(id, NotificationType::Message, "t", "d", date, expires_at).unwrap()
}

#[test]
fn second_pass_is_byte_identical() {
    let config = NotificationConfig::default();
    let persisted = vec![message("m-1", now() - Duration::hours(3), None)];

    let snap = snapshot();

    let first = reconcile(now(), persisted, &snap, &config);
    assert_eq!(first.added, 2);
    let first_bytes = serde_json::to_string(&first.notifications).unwrap();

    let second = reconcile(now(), first.notifications, &snap, &config);
    assert_eq!(second.added, 0);
    assert_eq!(serde_json::to_string(&second.notifications).unwrap(), first_bytes);
}

#[test]
fn expired_entries_are_dropped_on_next_pass() {
    let config = NotificationConfig::default();
    let persisted = vec![
        message("old", now() - Duration::days(2), Some(now() - Duration::days(1))),
        message("edge", now() - Duration::days(2), Some(now())),
        message("fresh", now() - Duration::days(2), Some(now() + Duration::days(1))),
    ];

    let result = reconcile(now(), persisted, &SourceSnapshot::default(), &config);
    let ids: Vec<&str> = result.notifications.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(result.expired, 2);
    assert!(ids.contains(&"fresh"));
    assert!(!ids.contains(&"old"));
    assert!(!ids.contains(&"edge"));
}

#[test]
fn output_is_newest_first_with_unique_ids() {
    let config = NotificationConfig::default();
    let persisted = vec![
        message("a", now() - Duration::days(3), None),
        message("b", now() - Duration::days(1), None),
        message("a", now() - Duration::days(2), None),
    ];
    let quiet = SourceSnapshot {
        last_journal_date: Some(now().date_naive()),
        ..SourceSnapshot::default()
    };

    let result = reconcile(now(), persisted, &quiet, &config);
    let ids: Vec<&str> = result.notifications.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, vec!["b", "a"]);
    assert_eq!(
        result.notifications[1].date,
        now() - Duration::days(3),
        "first persisted duplicate wins"
    );
}

#[test]
fn read_state_survives_reconciliation() {
    let config = NotificationConfig::default();
    let snap = snapshot();
    let mut first = reconcile(now(), Vec::new(), &snap, &config).notifications;
    for notification in &mut first {
        notification.read = true;
    }

    let second = reconcile(now() + Duration::hours(1), first, &snap, &config);
    assert_eq!(second.added, 0);
    assert!(second.notifications.iter().all(|n| n.read));
}

#[test]
fn a_recreated_appointment_is_a_new_countdown() {
    let config = NotificationConfig::default();
    let first = reconcile(now(), Vec::new(), &snapshot(), &config);

    // Same title and slot, new row id: the old countdown does not suppress it.
    let second = reconcile(now(), first.notifications, &snapshot(), &config);
    assert_eq!(second.added, 1);
    assert_eq!(second.notifications.len(), 3);
}
