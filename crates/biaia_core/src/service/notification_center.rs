//! Notification center: the public read/write surface.
//!
//! # Responsibility
//! - Own the in-memory notification list, the enabled flag, the last source
//!   snapshot and the live poller.
//! - Run reconciliation on source changes and when notifications are
//!   switched on.
//! - Persist every change through `NotificationStore`.
//!
//! # Invariants
//! - Every load -> compute -> persist round trip runs under the state lock,
//!   so reconciliation, poller ticks and user mutations never interleave.
//! - Lock order is poller, then state. Poller ticks only take the state lock.
//! - Persistence failures are logged; the in-memory update still applies.
//! - Source-fetch failures skip the cycle and are never surfaced.

use crate::config::{ConfigError, NotificationConfig};
use crate::model::notification::Notification;
use crate::model::source::SourceSnapshot;
use crate::repo::change_feed::SourceChange;
use crate::repo::kv_store::KeyValueStore;
use crate::service::appointment_watch::AppointmentWatch;
use crate::service::clock::Clock;
use crate::service::notification_store::NotificationStore;
use crate::service::poller::{Poller, PollerState};
use crate::service::reconcile::{reconcile, sort_newest_first};
use crate::service::sources::NotificationSources;
use crate::service::system_notifier::{Permission, SystemNotifier};
use log::{debug, error, info, warn};
use std::collections::HashSet;
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::thread::{self, JoinHandle};
use std::time::Instant;

/// Dependencies injected into a `NotificationCenter`.
pub struct CenterDeps {
    pub sources: Arc<dyn NotificationSources>,
    pub store: Arc<dyn KeyValueStore>,
    pub notifier: Arc<dyn SystemNotifier>,
    pub clock: Arc<dyn Clock>,
}

struct CenterState {
    notifications: Vec<Notification>,
    enabled: bool,
    snapshot: Option<SourceSnapshot>,
    watch: AppointmentWatch,
}

struct CenterInner {
    sources: Arc<dyn NotificationSources>,
    store: NotificationStore,
    notifier: Arc<dyn SystemNotifier>,
    clock: Arc<dyn Clock>,
    config: NotificationConfig,
    state: Mutex<CenterState>,
}

/// Explicit context object shared with UI layers by reference or `Arc`.
pub struct NotificationCenter {
    inner: Arc<CenterInner>,
    poller: Mutex<Poller>,
}

impl NotificationCenter {
    /// Builds a center and loads the persisted list and enabled setting.
    ///
    /// The poller stays idle until `start` or `set_enabled(true)`.
    pub fn new(deps: CenterDeps, config: NotificationConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let store = NotificationStore::new(deps.store, &config);
        let mut notifications = store.load();
        sort_newest_first(&mut notifications);
        let enabled = store.load_enabled();
        let state = CenterState {
            notifications,
            enabled,
            snapshot: None,
            watch: AppointmentWatch::new(&config),
        };

        let poller = Poller::new(config.poll_interval());
        Ok(Self {
            inner: Arc::new(CenterInner {
                sources: deps.sources,
                store,
                notifier: deps.notifier,
                clock: deps.clock,
                config,
                state: Mutex::new(state),
            }),
            poller: Mutex::new(poller),
        })
    }

    /// Applies the persisted enabled setting: refresh and arm when enabled.
    pub fn start(&self) {
        if self.is_enabled() {
            self.refresh();
            self.arm_poller();
        }
    }

    /// Disarms the poller. Safe to call repeatedly.
    pub fn shutdown(&self) {
        lock(&self.poller).disarm();
    }

    /// Current list, newest first.
    pub fn list(&self) -> Vec<Notification> {
        self.inner.state().notifications.clone()
    }

    pub fn unread_count(&self) -> usize {
        self.inner
            .state()
            .notifications
            .iter()
            .filter(|notification| !notification.read)
            .count()
    }

    /// Marks one notification read. Unknown ids are ignored.
    pub fn mark_read(&self, id: &str) {
        let mut state = self.inner.state();
        let Some(notification) = state.notifications.iter_mut().find(|n| n.id == id) else {
            debug!("event=mark_read module=center status=skip reason=not_found");
            return;
        };
        notification.read = true;
        self.inner.persist(&state.notifications, "mark_read");
    }

    pub fn mark_all_read(&self) {
        let mut state = self.inner.state();
        for notification in &mut state.notifications {
            notification.read = true;
        }
        self.inner.persist(&state.notifications, "mark_all_read");
    }

    /// Removes one notification. Unknown ids are ignored.
    ///
    /// A rule whose inputs are unchanged regenerates the same id on the next
    /// reconciliation.
    pub fn delete(&self, id: &str) {
        let mut state = self.inner.state();
        let before = state.notifications.len();
        state.notifications.retain(|notification| notification.id != id);
        if state.notifications.len() == before {
            debug!("event=delete module=center status=skip reason=not_found");
            return;
        }
        self.inner.persist(&state.notifications, "delete");
    }

    /// Clears the list and removes the persisted key.
    pub fn delete_all(&self) {
        let mut state = self.inner.state();
        state.notifications.clear();
        if let Err(err) = self.inner.store.clear() {
            error!(
                "event=delete_all module=center status=error error_code=store_clear_failed error={}",
                err
            );
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.state().enabled
    }

    /// Persists the setting; enabling reconciles and arms the poller,
    /// disabling disarms it before returning.
    pub fn set_enabled(&self, enabled: bool) {
        let mut poller = lock(&self.poller);
        {
            let mut state = self.inner.state();
            state.enabled = enabled;
            if let Err(err) = self.inner.store.save_enabled(enabled) {
                error!(
                    "event=set_enabled module=center status=error error_code=store_write_failed error={}",
                    err
                );
            }
        }
        info!("event=set_enabled module=center status=ok enabled={enabled}");

        if enabled {
            self.inner.refresh();
            arm(&self.inner, &mut poller);
        } else {
            poller.disarm();
        }
    }

    pub fn poller_state(&self) -> PollerState {
        lock(&self.poller).state()
    }

    /// Fetches sources and reconciles. Returns whether a pass ran.
    pub fn refresh(&self) -> bool {
        self.inner.refresh()
    }

    /// Reconciles against an already-fetched snapshot.
    pub fn reconcile_with(&self, snapshot: SourceSnapshot) -> bool {
        self.inner.reconcile_with(snapshot)
    }

    /// Reacts to a committed source change by re-running `refresh`.
    ///
    /// Changes made by users the sources do not track are ignored.
    pub fn handle_source_change(&self, change: &SourceChange) -> bool {
        if !self.inner.sources.tracks_user(change.user_id()) {
            debug!(
                "event=source_change module=center status=skip reason=other_user change={}",
                change.event_name()
            );
            return false;
        }
        debug!(
            "event=source_change module=center status=start change={}",
            change.event_name()
        );
        self.inner.refresh()
    }

    /// Runs one poller tick now and returns the notifications it fired.
    pub fn poll_now(&self) -> Vec<Notification> {
        self.inner.poll_tick()
    }

    fn arm_poller(&self) {
        let mut poller = lock(&self.poller);
        arm(&self.inner, &mut poller);
    }
}

impl Drop for NotificationCenter {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Drives `handle_source_change` from a change-feed subscription until every
/// sender is dropped.
pub fn spawn_change_listener(
    center: Arc<NotificationCenter>,
    changes: Receiver<SourceChange>,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("biaia-change-listener".to_string())
        .spawn(move || {
            for change in changes {
                center.handle_source_change(&change);
            }
        })
}

fn arm(inner: &Arc<CenterInner>, poller: &mut Poller) {
    let weak: Weak<CenterInner> = Arc::downgrade(inner);
    poller.arm(move || {
        if let Some(inner) = weak.upgrade() {
            inner.poll_tick();
        }
    });
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl CenterInner {
    fn state(&self) -> MutexGuard<'_, CenterState> {
        lock(&self.state)
    }

    fn refresh(&self) -> bool {
        if !self.state().enabled {
            debug!("event=refresh module=center status=skip reason=disabled");
            return false;
        }

        let started_at = Instant::now();
        match self.sources.load_snapshot() {
            Ok(snapshot) => self.reconcile_with(snapshot),
            Err(err) => {
                warn!(
                    "event=refresh module=center status=skip duration_ms={} error_code=source_fetch_failed error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                false
            }
        }
    }

    fn reconcile_with(&self, snapshot: SourceSnapshot) -> bool {
        let mut state = self.state();
        if !state.enabled {
            debug!("event=reconcile module=center status=skip reason=disabled");
            return false;
        }

        let now = self.clock.now();
        let persisted = self.store.load();
        let result = reconcile(now, persisted, &snapshot, &self.config);
        info!(
            "event=reconcile module=center status=ok total={} added={} expired={}",
            result.notifications.len(),
            result.added,
            result.expired
        );

        state.snapshot = Some(snapshot);
        state.notifications = result.notifications;
        self.persist(&state.notifications, "reconcile");
        true
    }

    fn poll_tick(&self) -> Vec<Notification> {
        let fired = {
            let mut state = self.state();
            if !state.enabled {
                return Vec::new();
            }
            let now = self.clock.now();
            let CenterState {
                notifications,
                snapshot,
                watch,
                ..
            } = &mut *state;
            let appointments = snapshot
                .as_ref()
                .map(|snapshot| snapshot.appointments.as_slice())
                .unwrap_or_default();

            let existing: HashSet<&str> = notifications.iter().map(|n| n.id.as_str()).collect();
            let fresh: Vec<Notification> = watch
                .scan(now, appointments)
                .into_iter()
                .filter(|notification| !existing.contains(notification.id.as_str()))
                .collect();
            drop(existing);

            if fresh.is_empty() {
                return Vec::new();
            }

            notifications.extend(fresh.iter().cloned());
            sort_newest_first(notifications);
            self.persist(notifications, "poll_tick");
            info!(
                "event=poll_tick module=center status=ok fired={}",
                fresh.len()
            );
            fresh
        };

        if self.notifier.permission() == Permission::Granted {
            for notification in &fired {
                self.notifier.show(notification);
            }
        }
        fired
    }

    fn persist(&self, notifications: &[Notification], operation: &'static str) {
        if let Err(err) = self.store.save(notifications) {
            error!(
                "event=persist module=center status=error operation={} error_code=store_write_failed error={}",
                operation, err
            );
        }
    }
}
