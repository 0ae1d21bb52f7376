//! Source repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide point reads, ordered range reads and CRUD over `profiles`,
//!   `appointments` and `journal_entries`.
//! - Publish committed changes to the `ChangeFeed`.
//!
//! # Invariants
//! - Write paths call `validate()` before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Appointments are listed ascending by `date, time, id`.

use crate::db::{DbError, SharedConnection};
use crate::model::source::{
    Appointment, AppointmentId, JournalEntry, MoodType, Profile, SourceValidationError,
};
use crate::repo::change_feed::{ChangeFeed, SourceChange};
use chrono::{NaiveDate, NaiveTime};
use rusqlite::{params, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M";
const JOURNAL_LIST_LIMIT_MAX: u32 = 100;

const APPOINTMENT_SELECT_SQL: &str = "SELECT
    id,
    user_id,
    title,
    date,
    time,
    notes,
    reminder
FROM appointments";

const JOURNAL_SELECT_SQL: &str = "SELECT
    id,
    user_id,
    title,
    description,
    mood_type,
    mood_score,
    date
FROM journal_entries";

pub type RepoResult<T> = Result<T, RepoError>;

#[derive(Debug)]
pub enum RepoError {
    Validation(SourceValidationError),
    Db(DbError),
    NotFound(Uuid),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "record not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted source data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<SourceValidationError> for RepoError {
    fn from(value: SourceValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface over the relational source tables.
pub trait SourceRepository: Send + Sync {
    fn get_profile(&self, user_id: &str) -> RepoResult<Option<Profile>>;
    fn upsert_profile(&self, profile: &Profile) -> RepoResult<()>;
    fn list_appointments(&self, user_id: &str) -> RepoResult<Vec<Appointment>>;
    fn get_appointment(&self, id: AppointmentId) -> RepoResult<Option<Appointment>>;
    fn create_appointment(&self, appointment: &Appointment) -> RepoResult<AppointmentId>;
    fn update_appointment(&self, appointment: &Appointment) -> RepoResult<()>;
    fn delete_appointment(&self, id: AppointmentId) -> RepoResult<()>;
    fn create_journal_entry(&self, entry: &JournalEntry) -> RepoResult<Uuid>;
    /// Newest first; `limit` is clamped to 100.
    fn list_journal_entries(&self, user_id: &str, limit: u32) -> RepoResult<Vec<JournalEntry>>;
    fn last_journal_date(&self, user_id: &str) -> RepoResult<Option<NaiveDate>>;
}

/// SQLite-backed source repository.
#[derive(Clone)]
pub struct SqliteSourceRepository {
    conn: SharedConnection,
    feed: ChangeFeed,
}

impl SqliteSourceRepository {
    pub fn new(conn: SharedConnection) -> Self {
        Self::with_feed(conn, ChangeFeed::new())
    }

    pub fn with_feed(conn: SharedConnection, feed: ChangeFeed) -> Self {
        Self { conn, feed }
    }

    /// Feed that receives an event after every committed write.
    pub fn feed(&self) -> &ChangeFeed {
        &self.feed
    }
}

impl SourceRepository for SqliteSourceRepository {
    fn get_profile(&self, user_id: &str) -> RepoResult<Option<Profile>> {
        let conn = self.conn.lock()?;
        let mut stmt = conn.prepare(
            "SELECT user_id, name, due_date, symptoms, allergies
             FROM profiles
             WHERE user_id = ?1;",
        )?;
        let mut rows = stmt.query([user_id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_profile_row(row)?));
        }
        Ok(None)
    }

    fn upsert_profile(&self, profile: &Profile) -> RepoResult<()> {
        profile.validate()?;
        let symptoms = encode_list(&profile.symptoms)?;
        let allergies = encode_list(&profile.allergies)?;

        {
            let conn = self.conn.lock()?;
            conn.execute(
                "INSERT INTO profiles (user_id, name, due_date, symptoms, allergies)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(user_id) DO UPDATE SET
                    name = excluded.name,
                    due_date = excluded.due_date,
                    symptoms = excluded.symptoms,
                    allergies = excluded.allergies,
                    updated_at = (strftime('%s', 'now') * 1000);",
                params![
                    profile.user_id.as_str(),
                    profile.name.as_str(),
                    profile.due_date.format(DATE_FORMAT).to_string(),
                    symptoms,
                    allergies,
                ],
            )?;
        }

        self.feed.publish(SourceChange::ProfileChanged {
            user_id: profile.user_id.clone(),
        });
        Ok(())
    }

    fn list_appointments(&self, user_id: &str) -> RepoResult<Vec<Appointment>> {
        let conn = self.conn.lock()?;
        let mut stmt = conn.prepare(&format!(
            "{APPOINTMENT_SELECT_SQL}
             WHERE user_id = ?1
             ORDER BY date ASC, time ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([user_id])?;
        let mut appointments = Vec::new();
        while let Some(row) = rows.next()? {
            appointments.push(parse_appointment_row(row)?);
        }
        Ok(appointments)
    }

    fn get_appointment(&self, id: AppointmentId) -> RepoResult<Option<Appointment>> {
        let conn = self.conn.lock()?;
        let mut stmt = conn.prepare(&format!("{APPOINTMENT_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_appointment_row(row)?));
        }
        Ok(None)
    }

    fn create_appointment(&self, appointment: &Appointment) -> RepoResult<AppointmentId> {
        appointment.validate()?;

        {
            let conn = self.conn.lock()?;
            conn.execute(
                "INSERT INTO appointments (id, user_id, title, date, time, notes, reminder)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
                params![
                    appointment.id.to_string(),
                    appointment.user_id.as_str(),
                    appointment.title.as_str(),
                    appointment.date.format(DATE_FORMAT).to_string(),
                    appointment.time.format(TIME_FORMAT).to_string(),
                    appointment.notes.as_deref(),
                    bool_to_int(appointment.reminder),
                ],
            )?;
        }

        self.feed.publish(SourceChange::AppointmentInserted {
            user_id: appointment.user_id.clone(),
            id: appointment.id,
        });
        Ok(appointment.id)
    }

    fn update_appointment(&self, appointment: &Appointment) -> RepoResult<()> {
        appointment.validate()?;

        let changed = {
            let conn = self.conn.lock()?;
            conn.execute(
                "UPDATE appointments
                 SET
                    title = ?1,
                    date = ?2,
                    time = ?3,
                    notes = ?4,
                    reminder = ?5
                 WHERE id = ?6;",
                params![
                    appointment.title.as_str(),
                    appointment.date.format(DATE_FORMAT).to_string(),
                    appointment.time.format(TIME_FORMAT).to_string(),
                    appointment.notes.as_deref(),
                    bool_to_int(appointment.reminder),
                    appointment.id.to_string(),
                ],
            )?
        };

        if changed == 0 {
            return Err(RepoError::NotFound(appointment.id));
        }

        self.feed.publish(SourceChange::AppointmentUpdated {
            user_id: appointment.user_id.clone(),
            id: appointment.id,
        });
        Ok(())
    }

    fn delete_appointment(&self, id: AppointmentId) -> RepoResult<()> {
        let user_id = {
            let conn = self.conn.lock()?;
            let user_id: Option<String> = conn
                .query_row(
                    "SELECT user_id FROM appointments WHERE id = ?1;",
                    [id.to_string()],
                    |row| row.get(0),
                )
                .optional()?;
            let Some(user_id) = user_id else {
                return Err(RepoError::NotFound(id));
            };
            conn.execute("DELETE FROM appointments WHERE id = ?1;", [id.to_string()])?;
            user_id
        };

        self.feed
            .publish(SourceChange::AppointmentDeleted { user_id, id });
        Ok(())
    }

    fn create_journal_entry(&self, entry: &JournalEntry) -> RepoResult<Uuid> {
        entry.validate()?;

        {
            let conn = self.conn.lock()?;
            conn.execute(
                "INSERT INTO journal_entries (
                    id,
                    user_id,
                    title,
                    description,
                    mood_type,
                    mood_score,
                    date
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
                params![
                    entry.id.to_string(),
                    entry.user_id.as_str(),
                    entry.title.as_str(),
                    entry.description.as_str(),
                    entry.mood_type.as_str(),
                    i64::from(entry.mood_score),
                    entry.date.format(DATE_FORMAT).to_string(),
                ],
            )?;
        }

        self.feed.publish(SourceChange::JournalEntryAdded {
            user_id: entry.user_id.clone(),
            id: entry.id,
        });
        Ok(entry.id)
    }

    fn list_journal_entries(&self, user_id: &str, limit: u32) -> RepoResult<Vec<JournalEntry>> {
        let conn = self.conn.lock()?;
        let mut stmt = conn.prepare(&format!(
            "{JOURNAL_SELECT_SQL}
             WHERE user_id = ?1
             ORDER BY date DESC, created_at DESC, id ASC
             LIMIT ?2;"
        ))?;
        let limit = i64::from(limit.min(JOURNAL_LIST_LIMIT_MAX));
        let mut rows = stmt.query(params![user_id, limit])?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            entries.push(parse_journal_row(row)?);
        }
        Ok(entries)
    }

    fn last_journal_date(&self, user_id: &str) -> RepoResult<Option<NaiveDate>> {
        let conn = self.conn.lock()?;
        let value: Option<String> = conn
            .query_row(
                "SELECT date FROM journal_entries
                 WHERE user_id = ?1
                 ORDER BY date DESC
                 LIMIT 1;",
                [user_id],
                |row| row.get(0),
            )
            .optional()?;
        value
            .map(|text| parse_date(&text, "journal_entries.date"))
            .transpose()
    }
}

fn parse_profile_row(row: &Row<'_>) -> RepoResult<Profile> {
    let due_text: String = row.get("due_date")?;
    let profile = Profile {
        user_id: row.get("user_id")?,
        name: row.get("name")?,
        due_date: parse_date(&due_text, "profiles.due_date")?,
        symptoms: decode_list(row.get("symptoms")?, "profiles.symptoms")?,
        allergies: decode_list(row.get("allergies")?, "profiles.allergies")?,
    };
    profile.validate()?;
    Ok(profile)
}

fn parse_appointment_row(row: &Row<'_>) -> RepoResult<Appointment> {
    let date_text: String = row.get("date")?;
    let time_text: String = row.get("time")?;
    let reminder = match row.get::<_, i64>("reminder")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid reminder value `{other}` in appointments.reminder"
            )));
        }
    };

    let appointment = Appointment {
        id: parse_uuid(row, "appointments.id")?,
        user_id: row.get("user_id")?,
        title: row.get("title")?,
        date: parse_date(&date_text, "appointments.date")?,
        time: parse_time(&time_text)?,
        notes: row.get("notes")?,
        reminder,
    };
    appointment.validate()?;
    Ok(appointment)
}

fn parse_journal_row(row: &Row<'_>) -> RepoResult<JournalEntry> {
    let mood_text: String = row.get("mood_type")?;
    let mood_type = MoodType::parse(&mood_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid mood type `{mood_text}` in journal_entries.mood_type"
        ))
    })?;
    let score: i64 = row.get("mood_score")?;
    let mood_score = u8::try_from(score).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid mood score `{score}` in journal_entries.mood_score"
        ))
    })?;
    let date_text: String = row.get("date")?;

    let entry = JournalEntry {
        id: parse_uuid(row, "journal_entries.id")?,
        user_id: row.get("user_id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        mood_type,
        mood_score,
        date: parse_date(&date_text, "journal_entries.date")?,
    };
    entry.validate()?;
    Ok(entry)
}

fn parse_uuid(row: &Row<'_>, column: &str) -> RepoResult<Uuid> {
    let text: String = row.get("id")?;
    Uuid::parse_str(&text)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{text}` in {column}")))
}

fn parse_date(text: &str, column: &str) -> RepoResult<NaiveDate> {
    NaiveDate::parse_from_str(text, DATE_FORMAT)
        .map_err(|_| RepoError::InvalidData(format!("invalid date `{text}` in {column}")))
}

/// Accepts `HH:MM` and `HH:MM:SS`.
fn parse_time(text: &str) -> RepoResult<NaiveTime> {
    NaiveTime::parse_from_str(text, TIME_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M:%S"))
        .map_err(|_| RepoError::InvalidData(format!("invalid time `{text}` in appointments.time")))
}

fn encode_list(values: &[String]) -> RepoResult<Option<String>> {
    if values.is_empty() {
        return Ok(None);
    }
    serde_json::to_string(values)
        .map(Some)
        .map_err(|err| RepoError::InvalidData(format!("failed to encode list: {err}")))
}

fn decode_list(value: Option<String>, column: &str) -> RepoResult<Vec<String>> {
    match value {
        None => Ok(Vec::new()),
        Some(text) => serde_json::from_str(&text)
            .map_err(|_| RepoError::InvalidData(format!("invalid json list in {column}"))),
    }
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
