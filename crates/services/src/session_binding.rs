use std::sync::Arc;

use storage::repository::{ActiveSessionRepository, ProgressRepository, StorageError};
use tutor_core::model::{LearnerId, LoginProvider, UserProgress};

/// Result of handing a snapshot to the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistOutcome {
    Saved,
    /// The same snapshot was already stored for this learner.
    Unchanged,
    /// Storage rejected the write. In-memory progress stays authoritative.
    Failed(String),
}

impl PersistOutcome {
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, PersistOutcome::Failed(_))
    }
}

/// Associates the logged-in learner with their stored progress.
pub struct SessionBinding {
    progress: Arc<dyn ProgressRepository>,
    sessions: Arc<dyn ActiveSessionRepository>,
    last_persisted: Option<(LearnerId, UserProgress)>,
}

impl SessionBinding {
    #[must_use]
    pub fn new(
        progress: Arc<dyn ProgressRepository>,
        sessions: Arc<dyn ActiveSessionRepository>,
    ) -> Self {
        Self {
            progress,
            sessions,
            last_persisted: None,
        }
    }

    /// Stored progress for `learner`, `None` if they never logged in here.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be read or decoded.
    pub async fn load(&mut self, learner: &LearnerId) -> Result<Option<UserProgress>, StorageError> {
        let loaded = self.progress.load_progress(learner).await?;
        if let Some(progress) = loaded.as_ref() {
            self.last_persisted = Some((learner.clone(), progress.clone()));
        }
        Ok(loaded)
    }

    /// Writes `progress` for `learner`. Writing the snapshot that was last
    /// stored is a no-op. Failures are logged and reported, never raised.
    pub async fn persist(&mut self, learner: &LearnerId, progress: &UserProgress) -> PersistOutcome {
        if let Some((stored_for, stored)) = self.last_persisted.as_ref() {
            if stored_for == learner && stored == progress {
                return PersistOutcome::Unchanged;
            }
        }

        match self.progress.save_progress(learner, progress).await {
            Ok(()) => {
                self.last_persisted = Some((learner.clone(), progress.clone()));
                tracing::debug!(learner = %learner, "progress persisted");
                PersistOutcome::Saved
            }
            Err(err) => {
                tracing::warn!(learner = %learner, error = %err, "failed to persist progress");
                PersistOutcome::Failed(err.to_string())
            }
        }
    }

    /// Logs a learner in: derives their id, creates default progress on first
    /// login and marks them as the active session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if progress cannot be loaded or created, or the
    /// active session cannot be recorded.
    pub async fn login(
        &mut self,
        provider: LoginProvider,
        username: &str,
    ) -> Result<(LearnerId, UserProgress), StorageError> {
        let learner = LearnerId::from_login(provider, username);
        let progress = match self.load(&learner).await? {
            Some(progress) => progress,
            None => {
                let fresh = UserProgress::default();
                self.progress.save_progress(&learner, &fresh).await?;
                self.last_persisted = Some((learner.clone(), fresh.clone()));
                tracing::info!(learner = %learner, "created progress for new learner");
                fresh
            }
        };
        self.sessions.set_active_learner(&learner).await?;
        Ok((learner, progress))
    }

    /// Clears the active session. Stored progress is kept.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the session row cannot be cleared.
    pub async fn logout(&mut self) -> Result<(), StorageError> {
        self.sessions.clear_active_learner().await?;
        self.last_persisted = None;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `StorageError` on read failures.
    pub async fn active_learner(&self) -> Result<Option<LearnerId>, StorageError> {
        self.sessions.active_learner().await
    }
}
