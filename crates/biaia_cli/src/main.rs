//! Command-line front end for the Biaia notification core.
//!
//! Wires the core against one SQLite file and exposes the notification
//! surface plus the source-data writes that feed it.

use biaia_core::{
    init_logging_with_options, open_db, spawn_change_listener, Appointment, AppointmentId,
    CenterDeps, JournalEntry, LogSystemNotifier, MoodType, NotificationCenter, NotificationConfig,
    Profile, RepoSources, SharedConnection, SourceRepository, SqliteKeyValueStore,
    SqliteSourceRepository, SystemClock,
};
use chrono::{NaiveDate, NaiveTime};
use clap::{Parser, Subcommand};
use log::info;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "biaia", version, about = "Pregnancy tracker notification center")]
struct Cli {
    /// SQLite database file.
    #[arg(long, default_value = "biaia.db")]
    db: PathBuf,
    /// User whose sources feed the notifications.
    #[arg(long)]
    user: String,
    /// JSON file overriding engine defaults.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Absolute directory for rolling log files.
    #[arg(long)]
    log_dir: Option<String>,
    #[arg(long, default_value_t = biaia_core::default_log_level().to_string())]
    log_level: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print notifications, newest first.
    List,
    /// Print the unread count.
    Unread,
    /// Fetch sources and reconcile.
    Refresh,
    MarkRead {
        id: String,
    },
    MarkAllRead,
    Delete {
        id: String,
    },
    /// Delete every notification.
    Clear,
    Enable,
    Disable,
    SetProfile {
        #[arg(long)]
        name: String,
        /// Due date, YYYY-MM-DD.
        #[arg(long)]
        due: NaiveDate,
    },
    AddAppointment {
        #[arg(long)]
        title: String,
        /// YYYY-MM-DD.
        #[arg(long)]
        date: NaiveDate,
        /// HH:MM.
        #[arg(long, value_parser = parse_time)]
        time: NaiveTime,
        #[arg(long)]
        notes: Option<String>,
    },
    DeleteAppointment {
        id: AppointmentId,
    },
    AddJournal {
        #[arg(long)]
        title: String,
        #[arg(long, value_parser = parse_mood)]
        mood: MoodType,
        #[arg(long, default_value_t = 50)]
        score: u8,
        /// YYYY-MM-DD.
        #[arg(long)]
        date: NaiveDate,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Arm the live poller and follow source changes for a while.
    Watch {
        #[arg(long, default_value_t = 5)]
        minutes: u64,
    },
}

fn parse_time(value: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(value, "%H:%M").map_err(|err| format!("expected HH:MM: {err}"))
}

fn parse_mood(value: &str) -> Result<MoodType, String> {
    MoodType::parse(value).ok_or_else(|| "expected positive|negative|neutral".to_string())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    if let Some(log_dir) = &cli.log_dir {
        init_logging_with_options(&cli.log_level, log_dir, true)?;
    }

    let config = match &cli.config {
        Some(path) => NotificationConfig::from_json_file(path)?,
        None => NotificationConfig::default(),
    };

    let conn = SharedConnection::new(open_db(&cli.db)?);
    let repo = SqliteSourceRepository::new(conn.clone());
    let center = Arc::new(NotificationCenter::new(
        CenterDeps {
            sources: Arc::new(RepoSources::new(repo.clone(), cli.user.clone())),
            store: Arc::new(SqliteKeyValueStore::new(conn)),
            notifier: Arc::new(LogSystemNotifier),
            clock: Arc::new(SystemClock),
        },
        config,
    )?);

    match cli.command {
        Command::List => print_list(&center),
        Command::Unread => println!("{}", center.unread_count()),
        Command::Refresh => {
            if center.refresh() {
                print_list(&center);
            } else {
                println!("notifications are disabled or sources are unavailable");
            }
        }
        Command::MarkRead { id } => center.mark_read(&id),
        Command::MarkAllRead => center.mark_all_read(),
        Command::Delete { id } => center.delete(&id),
        Command::Clear => center.delete_all(),
        Command::Enable => center.set_enabled(true),
        Command::Disable => center.set_enabled(false),
        Command::SetProfile { name, due } => {
            repo.upsert_profile(&Profile::new(cli.user.as_str(), name, due))?;
        }
        Command::AddAppointment {
            title,
            date,
            time,
            notes,
        } => {
            let mut appointment = Appointment::new(cli.user.as_str(), title, date, time);
            appointment.notes = notes;
            let id = repo.create_appointment(&appointment)?;
            println!("{id}");
        }
        Command::DeleteAppointment { id } => repo.delete_appointment(id)?,
        Command::AddJournal {
            title,
            mood,
            score,
            date,
            description,
        } => {
            let mut entry = JournalEntry::new(cli.user.as_str(), title, mood, score, date);
            entry.description = description;
            let id = repo.create_journal_entry(&entry)?;
            println!("{id}");
        }
        Command::Watch { minutes } => {
            spawn_change_listener(center.clone(), repo.feed().subscribe())?;
            center.start();
            info!("event=watch module=cli status=start minutes={minutes}");
            std::thread::sleep(Duration::from_secs(minutes.saturating_mul(60)));
            center.shutdown();
            print_list(&center);
        }
    }

    Ok(())
}

fn print_list(center: &NotificationCenter) {
    for notification in center.list() {
        let marker = if notification.read { "x" } else { " " };
        println!(
            "[{marker}] {:<11} {}  {}  {}: {}",
            notification.kind.as_str(),
            notification.date.format("%Y-%m-%d %H:%M"),
            notification.id,
            notification.title,
            notification.description
        );
    }
}
