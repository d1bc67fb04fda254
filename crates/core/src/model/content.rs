use std::fmt;

use crate::model::ids::LessonId;
use crate::model::language::ProgrammingLanguage;
use crate::model::question::QuizQuestion;

/// Lookup key for lesson and quiz content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentKey {
    pub language: ProgrammingLanguage,
    pub topic: LessonId,
}

impl ContentKey {
    #[must_use]
    pub fn new(language: ProgrammingLanguage, topic: LessonId) -> Self {
        Self { language, topic }
    }
}

impl fmt::Display for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.language.slug(), self.topic)
    }
}

/// Where a resolved artifact came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentOrigin {
    /// Bundled dataset, no network involved.
    Offline,
    /// Generated by the remote provider for this request.
    Remote,
    /// Provider quota exhausted; carries a notice instead of content.
    Degraded,
    /// Provider failed for any other reason; the caller may retry.
    Failed,
}

impl ContentOrigin {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ContentOrigin::Offline => "offline",
            ContentOrigin::Remote => "remote",
            ContentOrigin::Degraded => "degraded",
            ContentOrigin::Failed => "failed",
        }
    }
}

impl fmt::Display for ContentOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request-scoped result of content resolution. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentArtifact<T> {
    Offline(T),
    Remote(T),
    Degraded { notice: String },
    Failed { message: String },
}

/// Markdown lesson body.
pub type LessonArtifact = ContentArtifact<String>;

/// Ordered question set, never empty when a payload is present.
pub type QuizArtifact = ContentArtifact<Vec<QuizQuestion>>;

impl<T> ContentArtifact<T> {
    #[must_use]
    pub fn origin(&self) -> ContentOrigin {
        match self {
            ContentArtifact::Offline(_) => ContentOrigin::Offline,
            ContentArtifact::Remote(_) => ContentOrigin::Remote,
            ContentArtifact::Degraded { .. } => ContentOrigin::Degraded,
            ContentArtifact::Failed { .. } => ContentOrigin::Failed,
        }
    }

    #[must_use]
    pub fn payload(&self) -> Option<&T> {
        match self {
            ContentArtifact::Offline(payload) | ContentArtifact::Remote(payload) => Some(payload),
            ContentArtifact::Degraded { .. } | ContentArtifact::Failed { .. } => None,
        }
    }

    #[must_use]
    pub fn into_payload(self) -> Option<T> {
        match self {
            ContentArtifact::Offline(payload) | ContentArtifact::Remote(payload) => Some(payload),
            ContentArtifact::Degraded { .. } | ContentArtifact::Failed { .. } => None,
        }
    }

    /// User-facing text explaining why no payload is available.
    #[must_use]
    pub fn notice(&self) -> Option<&str> {
        match self {
            ContentArtifact::Degraded { notice } => Some(notice),
            ContentArtifact::Failed { message } => Some(message),
            ContentArtifact::Offline(_) | ContentArtifact::Remote(_) => None,
        }
    }
}
