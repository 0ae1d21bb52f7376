//! In-process change-subscription feed for source tables.
//!
//! Subscribers receive every event published after they subscribed.
//! Receivers that were dropped are pruned on the next publish.

use crate::model::source::{AppointmentId, JournalEntryId};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};

/// One committed change to a source table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceChange {
    AppointmentInserted { user_id: String, id: AppointmentId },
    AppointmentUpdated { user_id: String, id: AppointmentId },
    AppointmentDeleted { user_id: String, id: AppointmentId },
    ProfileChanged { user_id: String },
    JournalEntryAdded { user_id: String, id: JournalEntryId },
}

impl SourceChange {
    pub fn user_id(&self) -> &str {
        match self {
            Self::AppointmentInserted { user_id, .. }
            | Self::AppointmentUpdated { user_id, .. }
            | Self::AppointmentDeleted { user_id, .. }
            | Self::ProfileChanged { user_id }
            | Self::JournalEntryAdded { user_id, .. } => user_id,
        }
    }

    pub fn event_name(&self) -> &'static str {
        match self {
            Self::AppointmentInserted { .. } => "appointment_inserted",
            Self::AppointmentUpdated { .. } => "appointment_updated",
            Self::AppointmentDeleted { .. } => "appointment_deleted",
            Self::ProfileChanged { .. } => "profile_changed",
            Self::JournalEntryAdded { .. } => "journal_entry_added",
        }
    }
}

/// Fan-out publisher shared by repository clones.
#[derive(Clone, Default)]
pub struct ChangeFeed {
    subscribers: Arc<Mutex<Vec<Sender<SourceChange>>>>,
}

impl ChangeFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new subscriber.
    pub fn subscribe(&self) -> Receiver<SourceChange> {
        let (sender, receiver) = mpsc::channel();
        if let Ok(mut subscribers) = self.subscribers.lock() {
            subscribers.push(sender);
        }
        receiver
    }

    /// Delivers `change` to every live subscriber.
    pub fn publish(&self, change: SourceChange) {
        let Ok(mut subscribers) = self.subscribers.lock() else {
            return;
        };
        subscribers.retain(|sender| sender.send(change.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().map_or(0, |subscribers| subscribers.len())
    }
}
