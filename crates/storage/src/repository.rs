use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tutor_core::model::{LearnerId, TutorSettings, UserProgress};

use crate::codec::{decode_progress, encode_progress};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Key-value store of serialized progress, keyed by learner. Last write wins.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Fetch the stored progress for a learner.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be read or decoded.
    async fn load_progress(&self, learner: &LearnerId)
    -> Result<Option<UserProgress>, StorageError>;

    /// Replace the stored progress for a learner.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be encoded or written.
    async fn save_progress(
        &self,
        learner: &LearnerId,
        progress: &UserProgress,
    ) -> Result<(), StorageError>;
}

/// Which learner is currently logged in on this device.
#[async_trait]
pub trait ActiveSessionRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` on read failures.
    async fn active_learner(&self) -> Result<Option<LearnerId>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on write failures.
    async fn set_active_learner(&self, learner: &LearnerId) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on write failures.
    async fn clear_active_learner(&self) -> Result<(), StorageError>;
}

#[async_trait]
pub trait SettingsRepository: Send + Sync {
    /// Fetch persisted settings, `None` if never saved.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the row cannot be read or fails validation.
    async fn get_settings(&self) -> Result<Option<TutorSettings>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the settings cannot be stored.
    async fn save_settings(&self, settings: &TutorSettings) -> Result<(), StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
///
/// Progress is kept in its encoded form so round-trips exercise the same codec
/// as the `SQLite` backend.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    progress: Arc<Mutex<HashMap<LearnerId, String>>>,
    active: Arc<Mutex<Option<LearnerId>>>,
    settings: Arc<Mutex<Option<TutorSettings>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn load_progress(
        &self,
        learner: &LearnerId,
    ) -> Result<Option<UserProgress>, StorageError> {
        let guard = self.progress.lock().map_err(poisoned)?;
        guard.get(learner).map(|raw| decode_progress(raw)).transpose()
    }

    async fn save_progress(
        &self,
        learner: &LearnerId,
        progress: &UserProgress,
    ) -> Result<(), StorageError> {
        let raw = encode_progress(progress)?;
        let mut guard = self.progress.lock().map_err(poisoned)?;
        guard.insert(learner.clone(), raw);
        Ok(())
    }
}

#[async_trait]
impl ActiveSessionRepository for InMemoryRepository {
    async fn active_learner(&self) -> Result<Option<LearnerId>, StorageError> {
        let guard = self.active.lock().map_err(poisoned)?;
        Ok(guard.clone())
    }

    async fn set_active_learner(&self, learner: &LearnerId) -> Result<(), StorageError> {
        let mut guard = self.active.lock().map_err(poisoned)?;
        *guard = Some(learner.clone());
        Ok(())
    }

    async fn clear_active_learner(&self) -> Result<(), StorageError> {
        let mut guard = self.active.lock().map_err(poisoned)?;
        *guard = None;
        Ok(())
    }
}

#[async_trait]
impl SettingsRepository for InMemoryRepository {
    async fn get_settings(&self) -> Result<Option<TutorSettings>, StorageError> {
        let guard = self.settings.lock().map_err(poisoned)?;
        Ok(guard.clone())
    }

    async fn save_settings(&self, settings: &TutorSettings) -> Result<(), StorageError> {
        let mut guard = self.settings.lock().map_err(poisoned)?;
        *guard = Some(settings.clone());
        Ok(())
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub progress: Arc<dyn ProgressRepository>,
    pub sessions: Arc<dyn ActiveSessionRepository>,
    pub settings: Arc<dyn SettingsRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let progress: Arc<dyn ProgressRepository> = Arc::new(repo.clone());
        let sessions: Arc<dyn ActiveSessionRepository> = Arc::new(repo.clone());
        let settings: Arc<dyn SettingsRepository> = Arc::new(repo);
        Self {
            progress,
            sessions,
            settings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tutor_core::model::{LoginProvider, ProgrammingLanguage};

    #[tokio::test]
    async fn round_trips_progress_per_learner() {
        let repo = InMemoryRepository::new();
        let ada = LearnerId::from_login(LoginProvider::Local, "ada");
        let bob = LearnerId::from_login(LoginProvider::Local, "bob");

        assert!(repo.load_progress(&ada).await.unwrap().is_none());

        let progress = UserProgress::default().select_language(ProgrammingLanguage::Swift);
        repo.save_progress(&ada, &progress).await.unwrap();

        assert_eq!(repo.load_progress(&ada).await.unwrap(), Some(progress));
        assert!(repo.load_progress(&bob).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn last_write_wins() {
        let repo = InMemoryRepository::new();
        let ada = LearnerId::new("local_ada");
        let first = UserProgress::default().select_language(ProgrammingLanguage::Go);
        let second = first.clone().select_language(ProgrammingLanguage::Php);

        repo.save_progress(&ada, &second).await.unwrap();
        repo.save_progress(&ada, &first).await.unwrap();

        assert_eq!(repo.load_progress(&ada).await.unwrap(), Some(first));
    }

    #[tokio::test]
    async fn active_session_set_and_clear() {
        let storage = Storage::in_memory();
        let ada = LearnerId::new("local_ada");

        storage.sessions.set_active_learner(&ada).await.unwrap();
        assert_eq!(storage.sessions.active_learner().await.unwrap(), Some(ada));

        storage.sessions.clear_active_learner().await.unwrap();
        assert!(storage.sessions.active_learner().await.unwrap().is_none());
    }
}
