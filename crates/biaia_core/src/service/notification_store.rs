//! Typed accessor for the persisted notification list and enabled setting.
//!
//! # Invariants
//! - `save` writes the full list with a single `set` call.
//! - Malformed persisted data loads as an empty list; `read` flags in it are
//!   lost and every other entry is re-derived on the next reconciliation.
//! - A missing or unreadable enabled setting means enabled.

use crate::config::NotificationConfig;
use crate::model::notification::Notification;
use crate::repo::kv_store::{KeyValueStore, StoreError};
use log::{error, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

const ENABLED_TRUE: &str = "true";
const ENABLED_FALSE: &str = "false";

#[derive(Debug)]
pub enum NotificationError {
    Store(StoreError),
    Serialize(serde_json::Error),
}

impl Display for NotificationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "notification store failure: {err}"),
            Self::Serialize(err) => write!(f, "failed to serialize notifications: {err}"),
        }
    }
}

impl Error for NotificationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::Serialize(err) => Some(err),
        }
    }
}

impl From<StoreError> for NotificationError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<serde_json::Error> for NotificationError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialize(value)
    }
}

#[derive(Clone)]
pub struct NotificationStore {
    kv: Arc<dyn KeyValueStore>,
    list_key: String,
    enabled_key: String,
}

impl NotificationStore {
    pub fn new(kv: Arc<dyn KeyValueStore>, config: &NotificationConfig) -> Self {
        Self {
            kv,
            list_key: config.list_key.clone(),
            enabled_key: config.enabled_key.clone(),
        }
    }

    /// Loads the persisted list, degrading to empty on any failure.
    pub fn load(&self) -> Vec<Notification> {
        let raw = match self.kv.get(&self.list_key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(err) => {
                error!(
                    "event=notifications_load module=store status=error error_code=store_read_failed error={}",
                    err
                );
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<Notification>>(&raw) {
            Ok(notifications) => notifications,
            Err(err) => {
                warn!(
                    "event=notifications_load module=store status=error error_code=corrupt_list bytes={} error={}",
                    raw.len(),
                    err
                );
                Vec::new()
            }
        }
    }

    pub fn save(&self, notifications: &[Notification]) -> Result<(), NotificationError> {
        let raw = serde_json::to_string(notifications)?;
        self.kv.set(&self.list_key, &raw)?;
        Ok(())
    }

    /// Removes the list key entirely.
    pub fn clear(&self) -> Result<(), NotificationError> {
        self.kv.remove(&self.list_key)?;
        Ok(())
    }

    pub fn load_enabled(&self) -> bool {
        match self.kv.get(&self.enabled_key) {
            Ok(Some(value)) => value.trim() != ENABLED_FALSE,
            Ok(None) => true,
            Err(err) => {
                error!(
                    "event=enabled_load module=store status=error error_code=store_read_failed error={}",
                    err
                );
                true
            }
        }
    }

    pub fn save_enabled(&self, enabled: bool) -> Result<(), NotificationError> {
        let value = if enabled { ENABLED_TRUE } else { ENABLED_FALSE };
        self.kv.set(&self.enabled_key, value)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::NotificationStore;
    use crate::config::NotificationConfig;
    use crate::repo::kv_store::{KeyValueStore, MemoryKeyValueStore};
    use std::sync::Arc;

    #[test]
    fn corrupt_list_loads_as_empty() {
        let kv = Arc::new(MemoryKeyValueStore::new());
        kv.set("biaia_notifications", "[{\"id\": 12").unwrap();
        let store = NotificationStore::new(kv, &NotificationConfig::default());
        assert!(store.load().is_empty());
    }

    #[test]
    fn enabled_defaults_to_true_and_round_trips() {
        let kv = Arc::new(MemoryKeyValueStore::new());
        let store = NotificationStore::new(kv.clone(), &NotificationConfig::default());
        assert!(store.load_enabled());

        store.save_enabled(false).unwrap();
        assert!(!store.load_enabled());
        assert_eq!(
            kv.get("biaia_notifications_enabled").unwrap().as_deref(),
            Some("false")
        );
        assert_eq!(kv.get("biaia_notifications").unwrap(), None);
    }
}
