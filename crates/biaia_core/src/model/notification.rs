//! Notification record.
//!
//! # Responsibility
//! - Define the persisted notification shape and its wire field names.
//! - Enforce the expiry invariant at construction and on deserialization.
//!
//! # Invariants
//! - `id` is non-empty.
//! - `expires_at >= date` when `expires_at` is set.
//! - `read` only changes through explicit user action.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Timestamp type used across the engine: wall-clock time with its offset.
pub type Timestamp = DateTime<FixedOffset>;

/// Display category of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    Appointment,
    Reminder,
    Tip,
    Message,
}

impl NotificationType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Appointment => "appointment",
            Self::Reminder => "reminder",
            Self::Tip => "tip",
            Self::Message => "message",
        }
    }
}

/// Validation errors for notification records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationValidationError {
    EmptyId,
    ExpiresBeforeDate { date: Timestamp, expires_at: Timestamp },
}

impl Display for NotificationValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyId => write!(f, "notification id must not be empty"),
            Self::ExpiresBeforeDate { date, expires_at } => write!(
                f,
                "expiresAt ({}) must be >= date ({})",
                expires_at.to_rfc3339(),
                date.to_rfc3339()
            ),
        }
    }
}

impl Error for NotificationValidationError {}

/// One entry of the persisted notification list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "NotificationWire")]
pub struct Notification {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub read: bool,
    /// Creation timestamp; the list is ordered by this field, newest first.
    pub date: Timestamp,
    /// Lazy-expiry deadline, applied on the next reconciliation pass.
    #[serde(rename = "expiresAt", skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<Timestamp>,
}

#[derive(Deserialize)]
struct NotificationWire {
    id: String,
    title: String,
    description: String,
    #[serde(rename = "type")]
    kind: NotificationType,
    #[serde(default)]
    read: bool,
    date: Timestamp,
    #[serde(rename = "expiresAt", default)]
    expires_at: Option<Timestamp>,
}

impl TryFrom<NotificationWire> for Notification {
    type Error = NotificationValidationError;

    fn try_from(wire: NotificationWire) -> Result<Self, Self::Error> {
        let notification = Self {
            id: wire.id,
            title: wire.title,
            description: wire.description,
            kind: wire.kind,
            read: wire.read,
            date: wire.date,
            expires_at: wire.expires_at,
        };
        notification.validate()?;
        Ok(notification)
    }
}

impl Notification {
    /// Creates an unread notification.
    ///
    /// # Errors
    /// - `EmptyId` when `id` is blank.
    /// - `ExpiresBeforeDate` when `expires_at < date`.
    pub fn new(
        id: impl Into<String>,
        kind: NotificationType,
        title: impl Into<String>,
        description: impl Into<String>,
        date: Timestamp,
        expires_at: Option<Timestamp>,
    ) -> Result<Self, NotificationValidationError> {
        let notification = Self {
            id: id.into(),
            title: title.into(),
            description: description.into(),
            kind,
            read: false,
            date,
            expires_at,
        };
        notification.validate()?;
        Ok(notification)
    }

    pub fn validate(&self) -> Result<(), NotificationValidationError> {
        if self.id.trim().is_empty() {
            return Err(NotificationValidationError::EmptyId);
        }
        if let Some(expires_at) = self.expires_at {
            if expires_at < self.date {
                return Err(NotificationValidationError::ExpiresBeforeDate {
                    date: self.date,
                    expires_at,
                });
            }
        }
        Ok(())
    }

    /// Returns whether the expiry deadline has been reached at `now`.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}
