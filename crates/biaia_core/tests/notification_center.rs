use biaia_core::{
    open_db_in_memory, spawn_change_listener, Appointment, CenterDeps, FixedClock, KeyValueStore,
    MemoryKeyValueStore, Notification, NotificationCenter, NotificationConfig,
    NotificationSources, Permission, PollerState, Profile, RepoError, RepoResult, RepoSources,
    SharedConnection, SourceChange, SourceRepository, SourceSnapshot, SqliteKeyValueStore,
    SqliteSourceRepository, SystemNotifier, Timestamp,
};
use chrono::{DateTime, Duration, NaiveTime};
use std::sync::{Arc, Mutex};
use std::time::Instant;

const LIST_KEY: &str = "biaia_notifications";
const ENABLED_KEY: &str = "biaia_notifications_enabled";

fn start() -> Timestamp {
    DateTime::parse_from_rfc3339("2026-03-09T14:00:30+01:00").unwrap()
}

struct StaticSources {
    snapshot: Mutex<Option<SourceSnapshot>>,
}

impl StaticSources {
    fn new(snapshot: SourceSnapshot) -> Arc<Self> {
        Arc::new(Self {
            snapshot: Mutex::new(Some(snapshot)),
        })
    }

    fn set(&self, snapshot: Option<SourceSnapshot>) {
        *self.snapshot.lock().unwrap() = snapshot;
    }
}

impl NotificationSources for StaticSources {
    fn load_snapshot(&self) -> RepoResult<SourceSnapshot> {
        self.snapshot
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| RepoError::InvalidData("database unreachable".to_string()))
    }
}

struct RecordingNotifier {
    permission: Permission,
    shown: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    fn new(permission: Permission) -> Arc<Self> {
        Arc::new(Self {
            permission,
            shown: Mutex::new(Vec::new()),
        })
    }

    fn shown(&self) -> Vec<String> {
        self.shown.lock().unwrap().clone()
    }
}

impl SystemNotifier for RecordingNotifier {
    fn permission(&self) -> Permission {
        self.permission
    }

    fn show(&self, notification: &Notification) {
        self.shown.lock().unwrap().push(notification.id.clone());
    }
}

struct Harness {
    center: NotificationCenter,
    sources: Arc<StaticSources>,
    store: Arc<MemoryKeyValueStore>,
    clock: Arc<FixedClock>,
    notifier: Arc<RecordingNotifier>,
}

fn harness_with(
    snapshot: SourceSnapshot,
    store: Arc<MemoryKeyValueStore>,
    permission: Permission,
) -> Harness {
    let sources = StaticSources::new(snapshot);
    let clock = Arc::new(FixedClock::new(start()));
    let notifier = RecordingNotifier::new(permission);
    let center = NotificationCenter::new(
        CenterDeps {
            sources: sources.clone(),
            store: store.clone(),
            notifier: notifier.clone(),
            clock: clock.clone(),
        },
        NotificationConfig::default(),
    )
    .unwrap();
    Harness {
        center,
        sources,
        store,
        clock,
        notifier,
    }
}

fn harness(snapshot: SourceSnapshot) -> Harness {
    harness_with(snapshot, Arc::new(MemoryKeyValueStore::new()), Permission::Granted)
}

fn appointment_at(days: i64, hour: u32, minute: u32) -> Appointment {
    Appointment::new(
        "u1",
        "Ultrasound",
        start().date_naive() + Duration::days(days),
        NaiveTime::from_hms_opt(hour, minute, 0).unwrap(),
    )
}

fn busy_snapshot() -> SourceSnapshot {
    SourceSnapshot {
        appointments: vec![appointment_at(2, 9, 0), appointment_at(0, 14, 0)],
        profile: Some(Profile::new(
            "u1",
            "Ada",
            start().date_naive() + Duration::days(140),
        )),
        last_journal_date: None,
    }
}

fn ids(center: &NotificationCenter) -> Vec<String> {
    center.list().into_iter().map(|n| n.id).collect()
}

fn persisted(store: &MemoryKeyValueStore) -> Option<Vec<Notification>> {
    store
        .get(LIST_KEY)
        .unwrap()
        .map(|raw| serde_json::from_str(&raw).unwrap())
}

#[test]
fn refresh_populates_list_and_persists_it() {
    let h = harness(busy_snapshot());
    assert!(h.center.list().is_empty());

    assert!(h.center.refresh());
    let list = h.center.list();
    assert_eq!(list.len(), 3);
    assert_eq!(h.center.unread_count(), 3);
    assert!(ids(&h.center).contains(&"journal-reminder-2026-03-09".to_string()));
    assert!(ids(&h.center).contains(&"weekly-update-week-21".to_string()));
    assert_eq!(persisted(&h.store).unwrap(), list);
}

#[test]
fn refresh_twice_leaves_persisted_bytes_unchanged() {
    let h = harness(busy_snapshot());
    h.center.refresh();
    let first = h.store.get(LIST_KEY).unwrap();

    h.center.refresh();
    assert_eq!(h.store.get(LIST_KEY).unwrap(), first);
}

#[test]
fn mark_read_and_mark_all_read() {
    let h = harness(busy_snapshot());
    h.center.refresh();

    h.center.mark_read("weekly-update-week-21");
    h.center.mark_read("does-not-exist");
    assert_eq!(h.center.unread_count(), 2);
    let stored = persisted(&h.store).unwrap();
    assert!(stored
        .iter()
        .any(|n| n.id == "weekly-update-week-21" && n.read));

    h.center.mark_all_read();
    assert_eq!(h.center.unread_count(), 0);
    assert!(persisted(&h.store).unwrap().iter().all(|n| n.read));

    h.center.refresh();
    assert_eq!(h.center.unread_count(), 0, "read flags must survive reconciliation");
}

#[test]
fn delete_and_delete_all() {
    let h = harness(busy_snapshot());
    h.center.refresh();

    h.center.delete("journal-reminder-2026-03-09");
    h.center.delete("does-not-exist");
    assert_eq!(h.center.list().len(), 2);
    assert_eq!(persisted(&h.store).unwrap().len(), 2);

    h.center.delete_all();
    assert!(h.center.list().is_empty());
    assert_eq!(h.store.get(LIST_KEY).unwrap(), None);
}

#[test]
fn deleted_notifications_return_while_rule_inputs_are_unchanged() {
    let h = harness(busy_snapshot());
    h.center.refresh();
    let before = ids(&h.center);

    h.center.delete_all();
    h.center.refresh();

    let mut after = ids(&h.center);
    let mut expected = before;
    after.sort();
    expected.sort();
    assert_eq!(after, expected);
}

#[test]
fn expired_entries_disappear_on_next_reconciliation() {
    let h = harness(busy_snapshot());
    h.center.refresh();
    assert!(ids(&h.center).contains(&"journal-reminder-2026-03-09".to_string()));

    h.clock.advance(Duration::days(1));
    assert!(
        ids(&h.center).contains(&"journal-reminder-2026-03-09".to_string()),
        "expiry is lazy"
    );

    h.center.refresh();
    let current = ids(&h.center);
    assert!(!current.contains(&"journal-reminder-2026-03-09".to_string()));
    assert!(current.contains(&"journal-reminder-2026-03-10".to_string()));
}

#[test]
fn poller_fires_once_per_minute_bucket() {
    let h = harness(busy_snapshot());
    h.center.refresh();
    h.clock.advance(Duration::seconds(10));

    let fired = h.center.poll_now();
    assert_eq!(fired.len(), 1);
    assert!(fired[0].id.starts_with("appointment-now-"));
    assert!(fired[0].id.ends_with("-2026-03-09-14-00"));
    assert_eq!(h.notifier.shown(), vec![fired[0].id.clone()]);

    h.clock.advance(Duration::seconds(15));
    assert!(h.center.poll_now().is_empty());
    assert_eq!(h.notifier.shown().len(), 1);

    let stored = persisted(&h.store).unwrap();
    assert_eq!(
        stored.iter().filter(|n| n.id == fired[0].id).count(),
        1
    );
    assert_eq!(h.center.list()[0].id, fired[0].id, "newest first");
}

#[test]
fn poller_stays_in_app_without_permission() {
    let h = harness_with(
        busy_snapshot(),
        Arc::new(MemoryKeyValueStore::new()),
        Permission::Default,
    );
    h.center.refresh();

    assert_eq!(h.center.poll_now().len(), 1);
    assert!(h.notifier.shown().is_empty());
}

#[test]
fn enabling_arms_poller_and_disabling_stops_everything() {
    let store = Arc::new(MemoryKeyValueStore::new());
    store.set(ENABLED_KEY, "false").unwrap();
    let h = harness_with(busy_snapshot(), store, Permission::Granted);
    assert!(!h.center.is_enabled());

    h.center.start();
    assert_eq!(h.center.poller_state(), PollerState::Idle);
    assert!(!h.center.refresh());
    assert!(h.center.list().is_empty());

    h.center.set_enabled(true);
    assert_eq!(h.center.poller_state(), PollerState::Armed);
    assert_eq!(h.store.get(ENABLED_KEY).unwrap().as_deref(), Some("true"));
    // Enabling reconciles, then the immediate tick sees the 14:00 appointment.
    assert_eq!(h.center.list().len(), 4);
    assert_eq!(h.notifier.shown().len(), 1);

    h.center.set_enabled(false);
    assert_eq!(h.center.poller_state(), PollerState::Idle);
    assert_eq!(h.store.get(ENABLED_KEY).unwrap().as_deref(), Some("false"));
    assert!(h.center.poll_now().is_empty());

    h.center.mark_all_read();
    assert_eq!(h.center.unread_count(), 0, "mutations work while disabled");
}

#[test]
fn source_fetch_failure_skips_the_cycle() {
    let h = harness(busy_snapshot());
    h.center.refresh();
    let before = h.center.list();

    h.sources.set(None);
    h.clock.advance(Duration::days(2));
    assert!(!h.center.refresh());
    assert_eq!(h.center.list(), before);
}

#[test]
fn corrupt_store_degrades_to_empty_list() {
    let store = Arc::new(MemoryKeyValueStore::new());
    store.set(LIST_KEY, "{not json").unwrap();

    let h = harness_with(busy_snapshot(), store, Permission::Denied);
    assert!(h.center.list().is_empty());

    assert!(h.center.refresh());
    assert_eq!(h.center.list().len(), 3);
    assert_eq!(persisted(&h.store).unwrap().len(), 3);
}

#[test]
fn state_is_restored_from_the_store() {
    let store = Arc::new(MemoryKeyValueStore::new());
    {
        let h = harness_with(busy_snapshot(), store.clone(), Permission::Denied);
        h.center.refresh();
        h.center.mark_all_read();
        h.center.set_enabled(false);
    }

    let h = harness_with(busy_snapshot(), store, Permission::Denied);
    assert!(!h.center.is_enabled());
    assert_eq!(h.center.list().len(), 3);
    assert_eq!(h.center.unread_count(), 0);
}

#[test]
fn change_feed_drives_reconciliation() {
    let conn = SharedConnection::new(open_db_in_memory().unwrap());
    let repo = SqliteSourceRepository::new(conn.clone());
    let changes = repo.feed().subscribe();
    let clock = Arc::new(FixedClock::new(start()));
    let center = Arc::new(
        NotificationCenter::new(
            CenterDeps {
                sources: Arc::new(RepoSources::new(repo.clone(), "u1")),
                store: Arc::new(SqliteKeyValueStore::new(conn)),
                notifier: RecordingNotifier::new(Permission::Denied),
                clock,
            },
            NotificationConfig::default(),
        )
        .unwrap(),
    );
    center.refresh();
    assert_eq!(ids(&center), vec!["journal-reminder-2026-03-09".to_string()]);

    spawn_change_listener(center.clone(), changes).unwrap();
    let appointment = appointment_at(4, 9, 30);
    repo.create_appointment(&appointment).unwrap();

    let expected = format!("appointment-{}-3", appointment.id);
    let deadline = Instant::now() + std::time::Duration::from_secs(5);
    while !ids(&center).contains(&expected) {
        assert!(Instant::now() < deadline, "listener never reconciled");
        std::thread::sleep(std::time::Duration::from_millis(10));
    }
}

#[test]
fn changes_from_other_users_are_ignored() {
    let conn = SharedConnection::new(open_db_in_memory().unwrap());
    let repo = SqliteSourceRepository::new(conn.clone());
    let center = NotificationCenter::new(
        CenterDeps {
            sources: Arc::new(RepoSources::new(repo, "u1")),
            store: Arc::new(SqliteKeyValueStore::new(conn)),
            notifier: RecordingNotifier::new(Permission::Denied),
            clock: Arc::new(FixedClock::new(start())),
        },
        NotificationConfig::default(),
    )
    .unwrap();

    let other = appointment_at(4, 9, 30);
    let foreign = SourceChange::AppointmentInserted {
        user_id: "u2".to_string(),
        id: other.id,
    };
    assert!(!center.handle_source_change(&foreign));
    assert!(center.list().is_empty());

    let own = SourceChange::ProfileChanged {
        user_id: "u1".to_string(),
    };
    assert!(center.handle_source_change(&own));
    assert_eq!(ids(&center), vec!["journal-reminder-2026-03-09".to_string()]);
}
