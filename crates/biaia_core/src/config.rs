//! Engine configuration.
//!
//! # Invariants
//! - Every field has a default; a config file only needs the fields it
//!   overrides.
//! - `validate()` passes before a config reaches the notification center.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_LIST_KEY: &str = "biaia_notifications";
pub const DEFAULT_ENABLED_KEY: &str = "biaia_notifications_enabled";

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "failed to read config: {err}"),
            Self::Parse(err) => write!(f, "failed to parse config: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

/// Tunables for rules, reconciliation and the live poller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Live poller period.
    pub poll_interval_secs: u64,
    /// How long a fired minute bucket is remembered by the poller.
    pub fired_retention_secs: u64,
    /// Max distance between now and an appointment start for a live match.
    pub match_window_secs: i64,
    /// Whole days before an appointment that produce a countdown reminder.
    pub countdown_days: Vec<i64>,
    pub journal_reminder_ttl_days: i64,
    pub weekly_update_ttl_days: i64,
    /// Store key holding the serialized notification list.
    pub list_key: String,
    /// Store key holding the enabled setting.
    pub enabled_key: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 60,
            fired_retention_secs: 5 * 60,
            match_window_secs: 60,
            countdown_days: vec![5, 3, 1],
            journal_reminder_ttl_days: 1,
            weekly_update_ttl_days: 7,
            list_key: DEFAULT_LIST_KEY.to_string(),
            enabled_key: DEFAULT_ENABLED_KEY.to_string(),
        }
    }
}

impl NotificationConfig {
    /// Reads and validates a JSON config file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "poll_interval_secs must be > 0".to_string(),
            ));
        }
        if self.match_window_secs < 0 {
            return Err(ConfigError::Invalid(
                "match_window_secs must be >= 0".to_string(),
            ));
        }
        if self.countdown_days.iter().any(|days| *days <= 0) {
            return Err(ConfigError::Invalid(
                "countdown_days entries must be > 0".to_string(),
            ));
        }
        if self.journal_reminder_ttl_days < 0 || self.weekly_update_ttl_days < 0 {
            return Err(ConfigError::Invalid(
                "notification ttl values must be >= 0".to_string(),
            ));
        }
        if self.list_key.trim().is_empty() || self.enabled_key.trim().is_empty() {
            return Err(ConfigError::Invalid("store keys must not be empty".to_string()));
        }
        if self.list_key == self.enabled_key {
            return Err(ConfigError::Invalid(
                "list_key and enabled_key must differ".to_string(),
            ));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn fired_retention(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::try_from(self.fired_retention_secs).unwrap_or(i64::MAX))
    }

    pub fn match_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.match_window_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, NotificationConfig};

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config = NotificationConfig::from_json_str(r#"{ "poll_interval_secs": 30 }"#).unwrap();
        assert_eq!(config.poll_interval_secs, 30);
        assert_eq!(config.countdown_days, vec![5, 3, 1]);
        assert_eq!(config.list_key, "biaia_notifications");
    }

    #[test]
    fn validate_rejects_zero_interval_and_shared_keys() {
        let err = NotificationConfig::from_json_str(r#"{ "poll_interval_secs": 0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let config = NotificationConfig {
            enabled_key: "biaia_notifications".to_string(),
            ..NotificationConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = NotificationConfig::from_json_str("{ nope").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
