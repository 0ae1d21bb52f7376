//! Core notification engine for the Biaia pregnancy tracker.
//!
//! Derives reminders from appointments, journal gaps and pregnancy week,
//! deduplicates them by deterministic id, and keeps the persisted list in
//! sync with user actions and a live "appointment now" poller.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, NotificationConfig};
pub use db::{open_db, open_db_in_memory, DbError, SharedConnection};
pub use logging::{default_log_level, init_logging, init_logging_with_options, logging_status};
pub use model::notification::{
    Notification, NotificationType, NotificationValidationError, Timestamp,
};
pub use model::source::{
    Appointment, AppointmentId, JournalEntry, MoodType, Profile, SourceSnapshot,
    SourceValidationError,
};
pub use repo::change_feed::{ChangeFeed, SourceChange};
pub use repo::kv_store::{
    KeyValueStore, MemoryKeyValueStore, SqliteKeyValueStore, StoreError, StoreResult,
};
pub use repo::source_repo::{RepoError, RepoResult, SourceRepository, SqliteSourceRepository};
pub use service::clock::{Clock, FixedClock, SystemClock};
pub use service::notification_center::{spawn_change_listener, CenterDeps, NotificationCenter};
pub use service::notification_store::{NotificationError, NotificationStore};
pub use service::poller::{Poller, PollerState};
pub use service::reconcile::{reconcile, Reconciliation};
pub use service::rules::{evaluate, pregnancy_week};
pub use service::sources::{NotificationSources, RepoSources};
pub use service::system_notifier::{
    LogSystemNotifier, NoopSystemNotifier, Permission, SystemNotifier,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
