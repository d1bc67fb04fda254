//! Shared error types for the services crate.

use thiserror::Error;

use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;
use tutor_core::model::{ContentOrigin, ProgressError, SettingsError};
use tutor_core::quiz::QuizError;

/// Errors emitted by a `RemoteGenerator`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GeneratorError {
    #[error("content generation is not configured")]
    Disabled,
    #[error("content provider quota exhausted")]
    QuotaExhausted,
    #[error("content provider returned an empty response")]
    EmptyResponse,
    #[error("content provider returned malformed content: {0}")]
    Malformed(String),
    #[error("content provider request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl GeneratorError {
    /// Quota and rate-limit exhaustion degrade instead of failing outright.
    #[must_use]
    pub fn is_quota_exhausted(&self) -> bool {
        match self {
            GeneratorError::QuotaExhausted => true,
            GeneratorError::HttpStatus(status) => {
                *status == reqwest::StatusCode::TOO_MANY_REQUESTS
            }
            _ => false,
        }
    }
}

/// Errors emitted by `QuizFlow`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizFlowError {
    /// Resolution produced no questions. The session stays `NotStarted`.
    #[error("quiz unavailable ({origin}): {notice}")]
    Unavailable {
        origin: ContentOrigin,
        notice: String,
    },
    #[error("quiz request was cancelled")]
    Aborted,
    #[error("a quiz request for this lesson is already in flight")]
    Busy,
    #[error("quiz request was superseded by a newer one")]
    Superseded,
    #[error(transparent)]
    Quiz(#[from] QuizError),
}

/// Errors emitted by `TutorChat`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TutorChatError {
    #[error("message is empty")]
    EmptyMessage,
}

/// Errors emitted by `FlashcardFlow`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FlashcardFlowError {
    /// Generation produced no cards. Progress is unchanged.
    #[error("flashcards unavailable ({origin}): {notice}")]
    Unavailable {
        origin: ContentOrigin,
        notice: String,
    },
    #[error(transparent)]
    Progress(#[from] ProgressError),
}

/// Errors emitted by `SettingsService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SettingsServiceError {
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Settings(#[from] SettingsServiceError),
}
