//! Merge of persisted notifications with fresh rule candidates.
//!
//! # Invariants
//! - Expired entries are dropped here and nowhere else (lazy expiry).
//! - Rules see the survivors, so already-seen ids stay suppressed.
//! - Output ids are unique; on duplicate persisted ids the first wins.
//! - Output is stable-sorted by `date`, newest first.

use crate::config::NotificationConfig;
use crate::model::notification::{Notification, Timestamp};
use crate::model::source::SourceSnapshot;
use crate::service::rules::evaluate;
use std::collections::HashSet;

/// Result of one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub notifications: Vec<Notification>,
    pub expired: usize,
    pub added: usize,
}

pub fn reconcile(
    now: Timestamp,
    persisted: Vec<Notification>,
    snapshot: &SourceSnapshot,
    config: &NotificationConfig,
) -> Reconciliation {
    let (expired_entries, live): (Vec<Notification>, Vec<Notification>) = persisted
        .into_iter()
        .partition(|notification| notification.is_expired(now));
    let expired = expired_entries.len();

    let mut ids = HashSet::with_capacity(live.len());
    let survivors: Vec<Notification> = live
        .into_iter()
        .filter(|notification| ids.insert(notification.id.clone()))
        .collect();

    let candidates = evaluate(now, snapshot, &survivors, config);
    let added = candidates.len();

    let mut notifications = survivors;
    notifications.extend(candidates);
    sort_newest_first(&mut notifications);

    Reconciliation {
        notifications,
        expired,
        added,
    }
}

/// Stable sort by creation date, newest first.
pub fn sort_newest_first(notifications: &mut [Notification]) {
    notifications.sort_by(|left, right| right.date.cmp(&left.date));
}
