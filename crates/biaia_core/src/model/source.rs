//! Source records the notification rules derive from.
//!
//! # Responsibility
//! - Mirror the `profiles`, `appointments` and `journal_entries` rows.
//! - Bundle the three read-only aggregates into a `SourceSnapshot`.
//!
//! # Invariants
//! - Appointment and journal ids are stable UUIDs.
//! - Appointment titles are non-empty; mood scores are within 0..=100.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type AppointmentId = Uuid;
pub type JournalEntryId = Uuid;

pub const MOOD_SCORE_MAX: u8 = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceValidationError {
    EmptyUserId,
    EmptyTitle,
    MoodScoreOutOfRange(u8),
}

impl Display for SourceValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyUserId => write!(f, "user id must not be empty"),
            Self::EmptyTitle => write!(f, "title must not be empty"),
            Self::MoodScoreOutOfRange(score) => {
                write!(f, "mood score {score} must be within 0..={MOOD_SCORE_MAX}")
            }
        }
    }
}

impl Error for SourceValidationError {}

/// Onboarding profile. Only `due_date` feeds the notification rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: String,
    pub name: String,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub symptoms: Vec<String>,
    #[serde(default)]
    pub allergies: Vec<String>,
}

impl Profile {
    pub fn new(user_id: impl Into<String>, name: impl Into<String>, due_date: NaiveDate) -> Self {
        Self {
            user_id: user_id.into(),
            name: name.into(),
            due_date,
            symptoms: Vec::new(),
            allergies: Vec::new(),
        }
    }

    pub fn validate(&self) -> Result<(), SourceValidationError> {
        if self.user_id.trim().is_empty() {
            return Err(SourceValidationError::EmptyUserId);
        }
        Ok(())
    }
}

/// Scheduled clinic appointment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: AppointmentId,
    pub user_id: String,
    pub title: String,
    /// Calendar day in the user's local time.
    pub date: NaiveDate,
    /// Wall-clock start time in the user's local time.
    pub time: NaiveTime,
    pub notes: Option<String>,
    pub reminder: bool,
}

impl Appointment {
    /// Creates an appointment with a generated id and reminders enabled.
    pub fn new(
        user_id: impl Into<String>,
        title: impl Into<String>,
        date: NaiveDate,
        time: NaiveTime,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            title: title.into(),
            date,
            time,
            notes: None,
            reminder: true,
        }
    }

    pub fn scheduled_at(&self) -> NaiveDateTime {
        self.date.and_time(self.time)
    }

    pub fn validate(&self) -> Result<(), SourceValidationError> {
        if self.user_id.trim().is_empty() {
            return Err(SourceValidationError::EmptyUserId);
        }
        if self.title.trim().is_empty() {
            return Err(SourceValidationError::EmptyTitle);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoodType {
    Positive,
    Negative,
    Neutral,
}

impl MoodType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::Neutral => "neutral",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "positive" => Some(Self::Positive),
            "negative" => Some(Self::Negative),
            "neutral" => Some(Self::Neutral),
            _ => None,
        }
    }
}

/// Journal entry with mood tagging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: JournalEntryId,
    pub user_id: String,
    pub title: String,
    pub description: String,
    pub mood_type: MoodType,
    pub mood_score: u8,
    pub date: NaiveDate,
}

impl JournalEntry {
    pub fn new(
        user_id: impl Into<String>,
        title: impl Into<String>,
        mood_type: MoodType,
        mood_score: u8,
        date: NaiveDate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            title: title.into(),
            description: String::new(),
            mood_type,
            mood_score,
            date,
        }
    }

    pub fn validate(&self) -> Result<(), SourceValidationError> {
        if self.user_id.trim().is_empty() {
            return Err(SourceValidationError::EmptyUserId);
        }
        if self.title.trim().is_empty() {
            return Err(SourceValidationError::EmptyTitle);
        }
        if self.mood_score > MOOD_SCORE_MAX {
            return Err(SourceValidationError::MoodScoreOutOfRange(self.mood_score));
        }
        Ok(())
    }
}

/// The three aggregates the rule evaluator and live poller read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceSnapshot {
    /// Ascending by date then time.
    pub appointments: Vec<Appointment>,
    /// `None` while onboarding is incomplete.
    pub profile: Option<Profile>,
    /// Date of the most recent journal entry, if any.
    pub last_journal_date: Option<NaiveDate>,
}
