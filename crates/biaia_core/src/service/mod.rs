//! Notification use-case services.
//!
//! # Responsibility
//! - Derive, reconcile and poll notifications from source aggregates.
//! - Expose the read/write surface through `NotificationCenter`.
//! - Keep UI layers decoupled from storage and timing details.

pub mod appointment_watch;
pub mod clock;
pub mod notification_center;
pub mod notification_store;
pub mod poller;
pub mod reconcile;
pub mod rules;
pub mod sources;
pub mod system_notifier;
