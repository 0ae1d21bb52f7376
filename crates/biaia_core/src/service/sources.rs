//! Source aggregation for the notification center.

use crate::model::source::SourceSnapshot;
use crate::repo::source_repo::{RepoResult, SourceRepository};

/// Supplies the current user's source aggregates.
pub trait NotificationSources: Send + Sync {
    fn load_snapshot(&self) -> RepoResult<SourceSnapshot>;

    /// Whether changes made by `user_id` can affect the snapshot.
    fn tracks_user(&self, _user_id: &str) -> bool {
        true
    }
}

/// Reads the snapshot for one user from a `SourceRepository`.
pub struct RepoSources<R: SourceRepository> {
    repo: R,
    user_id: String,
}

impl<R: SourceRepository> RepoSources<R> {
    pub fn new(repo: R, user_id: impl Into<String>) -> Self {
        Self {
            repo,
            user_id: user_id.into(),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }
}

impl<R: SourceRepository> NotificationSources for RepoSources<R> {
    fn load_snapshot(&self) -> RepoResult<SourceSnapshot> {
        let profile = self.repo.get_profile(&self.user_id)?;
        let appointments = self.repo.list_appointments(&self.user_id)?;
        let last_journal_date = self.repo.last_journal_date(&self.user_id)?;
        Ok(SourceSnapshot {
            appointments,
            profile,
            last_journal_date,
        })
    }

    fn tracks_user(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }
}
