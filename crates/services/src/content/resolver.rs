use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use tutor_core::model::{
    ChatMode, ChatTurn, ContentArtifact, ContentKey, FlashcardDraft, Lesson, LessonArtifact,
    LessonId, ProgrammingLanguage, QuizArtifact, QuizQuestion,
};

use crate::content::generator::{RemoteGenerator, StyleHint};
use crate::content::offline::OfflineDataset;
use crate::content::requests::{CancelSignal, RequestTracker};
use crate::error::GeneratorError;

const QUOTA_NOTICE: &str = "The content provider is out of quota right now. \
Bundled lessons and quizzes are still available; try again later.";

/// Outcome of a tracked request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<T> {
    Ready(ContentArtifact<T>),
    /// The caller cancelled before an artifact was produced.
    Aborted,
    /// A request for the same content was already in flight.
    Busy,
    /// A newer request was issued while this one was running.
    Superseded,
}

/// Turns `(language, lesson)` into content: bundled data first, then the
/// remote generator. Never fails; failures become artifacts.
pub struct ContentResolver {
    offline: Arc<OfflineDataset>,
    generator: Arc<dyn RemoteGenerator>,
    style: StyleHint,
    lesson_requests: RequestTracker,
    quiz_requests: RequestTracker,
}

impl ContentResolver {
    #[must_use]
    pub fn new(offline: Arc<OfflineDataset>, generator: Arc<dyn RemoteGenerator>) -> Self {
        Self {
            offline,
            generator,
            style: StyleHint::default(),
            lesson_requests: RequestTracker::new(),
            quiz_requests: RequestTracker::new(),
        }
    }

    #[must_use]
    pub fn with_style(mut self, style: StyleHint) -> Self {
        self.style = style;
        self
    }

    #[must_use]
    pub fn style(&self) -> StyleHint {
        self.style
    }

    pub async fn resolve_lesson(
        &self,
        language: ProgrammingLanguage,
        lesson: &LessonId,
    ) -> LessonArtifact {
        let key = ContentKey::new(language, lesson.clone());
        if let Some(text) = self.offline.lesson(&key) {
            tracing::debug!(%key, "lesson served from bundled data");
            return ContentArtifact::Offline(text.to_string());
        }

        tracing::debug!(%key, style = ?self.style, "lesson not bundled, asking generator");
        let topic = topic_for(language, lesson);
        match self.generator.generate_lesson(language, topic, self.style).await {
            Ok(text) if !text.trim().is_empty() => ContentArtifact::Remote(text),
            Ok(_) => failed(&key, &GeneratorError::EmptyResponse),
            Err(err) => degrade(&key, &err),
        }
    }

    pub async fn resolve_quiz(
        &self,
        language: ProgrammingLanguage,
        lesson: &LessonId,
    ) -> QuizArtifact {
        let key = ContentKey::new(language, lesson.clone());
        if let Some(questions) = self.offline.quiz(&key) {
            tracing::debug!(%key, count = questions.len(), "quiz served from bundled data");
            return ContentArtifact::Offline(questions.to_vec());
        }

        tracing::debug!(%key, "quiz not bundled, asking generator");
        let topic = topic_for(language, lesson);
        match self.generator.generate_quiz(language, topic).await {
            Ok(questions) if !questions.is_empty() => ContentArtifact::Remote(questions),
            Ok(_) => failed(&key, &GeneratorError::Malformed("no questions".into())),
            Err(err) => degrade(&key, &err),
        }
    }

    /// Asks the generator for the next tutor reply. There is no bundled
    /// fallback, so the artifact is always `Remote`, `Degraded` or `Failed`.
    pub async fn chat(
        &self,
        language: Option<ProgrammingLanguage>,
        mode: &ChatMode,
        history: &[ChatTurn],
        input: &str,
    ) -> ContentArtifact<String> {
        match self.generator.chat(language, mode, history, input).await {
            Ok(reply) if !reply.trim().is_empty() => ContentArtifact::Remote(reply),
            Ok(_) => failed(mode, &GeneratorError::EmptyResponse),
            Err(err) => degrade(mode, &err),
        }
    }

    /// Generated review cards for `language`, classified like lessons.
    pub async fn generate_flashcards(
        &self,
        language: ProgrammingLanguage,
        topics: &[String],
    ) -> ContentArtifact<Vec<FlashcardDraft>> {
        match self.generator.generate_flashcards(language, topics).await {
            Ok(cards) if !cards.is_empty() => ContentArtifact::Remote(cards),
            Ok(_) => failed(&language, &GeneratorError::Malformed("no flashcards".into())),
            Err(err) => degrade(&language, &err),
        }
    }

    /// `None` if `cancel` fires before the artifact is ready.
    pub async fn resolve_lesson_cancellable(
        &self,
        language: ProgrammingLanguage,
        lesson: &LessonId,
        cancel: &CancelSignal,
    ) -> Option<LessonArtifact> {
        cancellable(cancel, self.resolve_lesson(language, lesson)).await
    }

    /// `None` if `cancel` fires before the artifact is ready.
    pub async fn resolve_quiz_cancellable(
        &self,
        language: ProgrammingLanguage,
        lesson: &LessonId,
        cancel: &CancelSignal,
    ) -> Option<QuizArtifact> {
        cancellable(cancel, self.resolve_quiz(language, lesson)).await
    }

    /// Tracked lesson request: refuses duplicates and discards results that
    /// arrive after a newer lesson request.
    pub async fn load_lesson(
        &self,
        language: ProgrammingLanguage,
        lesson: &LessonId,
        cancel: &CancelSignal,
    ) -> Resolution<String> {
        tracked(
            &self.lesson_requests,
            ContentKey::new(language, lesson.clone()),
            self.resolve_lesson_cancellable(language, lesson, cancel),
        )
        .await
    }

    /// Tracked quiz request, same rules as [`load_lesson`](Self::load_lesson).
    pub async fn load_quiz(
        &self,
        language: ProgrammingLanguage,
        lesson: &LessonId,
        cancel: &CancelSignal,
    ) -> Resolution<Vec<QuizQuestion>> {
        tracked(
            &self.quiz_requests,
            ContentKey::new(language, lesson.clone()),
            self.resolve_quiz_cancellable(language, lesson, cancel),
        )
        .await
    }
}

/// Catalog title when known, so the generator gets "Loops" rather than "loops".
fn topic_for(language: ProgrammingLanguage, lesson: &LessonId) -> &str {
    Lesson::find(language, lesson).map_or(lesson.as_str(), |entry| entry.title)
}

fn degrade<T>(key: &impl Display, err: &GeneratorError) -> ContentArtifact<T> {
    if err.is_quota_exhausted() {
        tracing::warn!(%key, error = %err, "generator quota exhausted, degrading");
        return ContentArtifact::Degraded {
            notice: QUOTA_NOTICE.to_string(),
        };
    }
    failed(key, err)
}

fn failed<T>(key: &impl Display, err: &GeneratorError) -> ContentArtifact<T> {
    tracing::warn!(%key, error = %err, "content generation failed");
    ContentArtifact::Failed {
        message: format!("Couldn't load this content ({err}). Please try again."),
    }
}

async fn cancellable<T>(cancel: &CancelSignal, work: impl Future<Output = T>) -> Option<T> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => {
            tracing::debug!("content request cancelled");
            None
        }
        artifact = work => Some(artifact),
    }
}

async fn tracked<T>(
    tracker: &RequestTracker,
    key: ContentKey,
    work: impl Future<Output = Option<ContentArtifact<T>>>,
) -> Resolution<T> {
    let Some(ticket) = tracker.begin(key) else {
        return Resolution::Busy;
    };
    let outcome = work.await;
    let key = ticket.key().clone();
    let latest = ticket.finish();
    match outcome {
        None => Resolution::Aborted,
        Some(_) if !latest => {
            tracing::debug!(%key, "discarding superseded content");
            Resolution::Superseded
        }
        Some(artifact) => Resolution::Ready(artifact),
    }
}
