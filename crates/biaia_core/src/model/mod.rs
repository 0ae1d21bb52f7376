//! Domain model for notifications and the source records they derive from.
//!
//! # Invariants
//! - Notification ids are deterministic and built only through
//!   `notification_id`.
//! - `expires_at`, when set, is never earlier than `date`.

pub mod notification;
pub mod notification_id;
pub mod source;
