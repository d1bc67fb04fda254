use std::sync::Arc;

use tutor_core::model::{ContentOrigin, ProgressError};
use tutor_core::quiz::{QuizCompletion, QuizError, QuizSession, QuizState};

use crate::content::{CancelSignal, ContentResolver, Resolution};
use crate::error::QuizFlowError;
use crate::progress_store::{ProgressStore, ProgressUpdate};

/// Drives a `QuizSession` from content request to recorded score.
#[derive(Clone)]
pub struct QuizFlow {
    resolver: Arc<ContentResolver>,
}

impl QuizFlow {
    #[must_use]
    pub fn new(resolver: Arc<ContentResolver>) -> Self {
        Self { resolver }
    }

    /// Resolves questions for the session's lesson and starts it.
    ///
    /// # Errors
    ///
    /// Returns `QuizFlowError` if the session already started or resolution
    /// yields no questions. The session stays `NotStarted` on failure.
    pub async fn request(&self, session: &mut QuizSession) -> Result<ContentOrigin, QuizFlowError> {
        self.request_cancellable(session, &CancelSignal::never())
            .await
    }

    /// Like [`request`](Self::request), abandoning the call when `cancel` fires.
    ///
    /// # Errors
    ///
    /// Additionally returns `QuizFlowError::Aborted`, `Busy` or `Superseded`
    /// for cancelled, duplicate or outdated requests.
    pub async fn request_cancellable(
        &self,
        session: &mut QuizSession,
        cancel: &CancelSignal,
    ) -> Result<ContentOrigin, QuizFlowError> {
        if !matches!(session.state(), QuizState::NotStarted) {
            return Err(QuizError::AlreadyStarted.into());
        }

        let artifact = match self
            .resolver
            .load_quiz(session.language(), session.lesson(), cancel)
            .await
        {
            Resolution::Ready(artifact) => artifact,
            Resolution::Aborted => return Err(QuizFlowError::Aborted),
            Resolution::Busy => return Err(QuizFlowError::Busy),
            Resolution::Superseded => return Err(QuizFlowError::Superseded),
        };

        let origin = artifact.origin();
        let notice = artifact.notice().unwrap_or_default().to_string();
        match artifact.into_payload() {
            Some(questions) => {
                session.start(questions)?;
                tracing::debug!(
                    language = %session.language(),
                    lesson = %session.lesson(),
                    %origin,
                    questions = session.question_count(),
                    "quiz started"
                );
                Ok(origin)
            }
            None => Err(QuizFlowError::Unavailable { origin, notice }),
        }
    }

    /// Reports a finished quiz to the learner's progress.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError` if the quiz does not belong to the active track.
    pub async fn record(
        store: &mut ProgressStore,
        completion: &QuizCompletion,
    ) -> Result<ProgressUpdate, ProgressError> {
        store.complete_quiz(completion).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tutor_core::model::{LessonId, ProgrammingLanguage, QuizQuestion};
    use tutor_core::quiz::Advance;

    use crate::content::{OfflineDataset, RemoteGenerator, StyleHint};
    use crate::error::GeneratorError;

    struct QuotaGenerator;

    #[async_trait]
    impl RemoteGenerator for QuotaGenerator {
        async fn generate_lesson(
            &self,
            _language: ProgrammingLanguage,
            _topic: &str,
            _style: StyleHint,
        ) -> Result<String, GeneratorError> {
            Err(GeneratorError::QuotaExhausted)
        }

        async fn generate_quiz(
            &self,
            _language: ProgrammingLanguage,
            _topic: &str,
        ) -> Result<Vec<QuizQuestion>, GeneratorError> {
            Err(GeneratorError::QuotaExhausted)
        }
    }

    fn flow() -> QuizFlow {
        let resolver = ContentResolver::new(
            Arc::new(OfflineDataset::bundled()),
            Arc::new(QuotaGenerator),
        );
        QuizFlow::new(Arc::new(resolver))
    }

    #[tokio::test]
    async fn bundled_quiz_starts_the_session() {
        let flow = flow();
        let mut session = QuizSession::new(ProgrammingLanguage::Rust, LessonId::new("intro"));

        let origin = flow.request(&mut session).await.unwrap();
        assert_eq!(origin, ContentOrigin::Offline);
        assert!(matches!(
            session.state(),
            QuizState::InProgress {
                index: 0,
                correct: 0,
                feedback: None
            }
        ));

        let err = flow.request(&mut session).await.unwrap_err();
        assert!(matches!(err, QuizFlowError::Quiz(QuizError::AlreadyStarted)));
    }

    #[tokio::test]
    async fn degraded_resolution_keeps_session_not_started() {
        let flow = flow();
        let mut session = QuizSession::new(ProgrammingLanguage::Go, LessonId::new("loops"));

        let err = flow.request(&mut session).await.unwrap_err();
        match err {
            QuizFlowError::Unavailable { origin, notice } => {
                assert_eq!(origin, ContentOrigin::Degraded);
                assert!(!notice.is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(session.state(), &QuizState::NotStarted);
    }

    #[tokio::test]
    async fn cancelled_request_is_aborted() {
        let flow = flow();
        let mut session = QuizSession::new(ProgrammingLanguage::Go, LessonId::new("loops"));
        let (handle, signal) = CancelSignal::pair();
        handle.cancel();

        let err = flow
            .request_cancellable(&mut session, &signal)
            .await
            .unwrap_err();
        assert!(matches!(err, QuizFlowError::Aborted));
        assert_eq!(session.state(), &QuizState::NotStarted);
    }

    #[tokio::test]
    async fn answering_everything_correctly_scores_100() {
        let flow = flow();
        let mut session = QuizSession::new(ProgrammingLanguage::Python, LessonId::new("intro"));
        flow.request(&mut session).await.unwrap();

        let completion = loop {
            let correct = session.current_question().unwrap().correct_index();
            assert!(session.answer(correct).unwrap().is_correct);
            match session.advance().unwrap() {
                Advance::Next { .. } => {}
                Advance::Finished(completion) => break completion,
            }
        };
        assert!(completion.score.is_perfect());
        assert_eq!(completion.total, 3);
    }
}
