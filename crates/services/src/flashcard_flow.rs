use std::sync::Arc;

use tutor_core::model::{ProgressError, lessons};

use crate::content::ContentResolver;
use crate::error::FlashcardFlowError;
use crate::progress_store::{ProgressStore, ProgressUpdate};

/// Generates review cards for the active track and files them in progress.
#[derive(Clone)]
pub struct FlashcardFlow {
    resolver: Arc<ContentResolver>,
}

impl FlashcardFlow {
    #[must_use]
    pub fn new(resolver: Arc<ContentResolver>) -> Self {
        Self { resolver }
    }

    /// Asks for a deck on the lessons completed in the active track (the
    /// track's fundamentals when none are) and appends it.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::NoLanguageSelected` without an active track,
    /// and `FlashcardFlowError::Unavailable` when generation yields no cards.
    /// Progress is unchanged on error.
    pub async fn generate(
        &self,
        store: &mut ProgressStore,
    ) -> Result<(usize, ProgressUpdate), FlashcardFlowError> {
        let snapshot = store.snapshot();
        let language = snapshot
            .selected_language()
            .ok_or(ProgressError::NoLanguageSelected)?;
        let topics: Vec<String> = snapshot.language(language).map_or_else(Vec::new, |data| {
            lessons(language)
                .iter()
                .filter(|lesson| data.is_completed(&lesson.lesson_id()))
                .map(|lesson| lesson.title.to_string())
                .collect()
        });

        let artifact = self.resolver.generate_flashcards(language, &topics).await;
        let origin = artifact.origin();
        let notice = artifact.notice().unwrap_or_default().to_string();
        let Some(drafts) = artifact.into_payload() else {
            return Err(FlashcardFlowError::Unavailable { origin, notice });
        };
        let count = drafts.len();
        tracing::info!(language = %language, count, "flashcards generated");
        Ok((count, store.add_flashcards(drafts).await))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use storage::repository::Storage;
    use tutor_core::model::{
        ContentOrigin, FlashcardDraft, LearnerId, LessonId, ProgrammingLanguage, QuizQuestion,
        QuizScore,
    };
    use tutor_core::quiz::QuizCompletion;
    use tutor_core::time::fixed_clock;

    use crate::content::{OfflineDataset, RemoteGenerator, StyleHint};
    use crate::error::GeneratorError;
    use crate::session_binding::SessionBinding;

    /// Hands out one card per topic and remembers the topics it was given.
    #[derive(Default)]
    struct DeckGenerator {
        seen: Mutex<Vec<String>>,
        exhausted: bool,
    }

    #[async_trait]
    impl RemoteGenerator for DeckGenerator {
        async fn generate_lesson(
            &self,
            _language: ProgrammingLanguage,
            _topic: &str,
            _style: StyleHint,
        ) -> Result<String, GeneratorError> {
            Err(GeneratorError::Disabled)
        }

        async fn generate_quiz(
            &self,
            _language: ProgrammingLanguage,
            _topic: &str,
        ) -> Result<Vec<QuizQuestion>, GeneratorError> {
            Err(GeneratorError::Disabled)
        }

        async fn generate_flashcards(
            &self,
            language: ProgrammingLanguage,
            topics: &[String],
        ) -> Result<Vec<FlashcardDraft>, GeneratorError> {
            if self.exhausted {
                return Err(GeneratorError::QuotaExhausted);
            }
            self.seen.lock().unwrap().extend(topics.iter().cloned());
            let topics = if topics.is_empty() {
                vec![language.display_name().to_string()]
            } else {
                topics.to_vec()
            };
            Ok(topics
                .iter()
                .map(|topic| FlashcardDraft::new(format!("Explain {topic}"), "See notes").unwrap())
                .collect())
        }
    }

    fn flow(generator: Arc<DeckGenerator>) -> FlashcardFlow {
        let resolver = ContentResolver::new(Arc::new(OfflineDataset::empty()), generator);
        FlashcardFlow::new(Arc::new(resolver))
    }

    async fn store() -> ProgressStore {
        let storage = Storage::in_memory();
        let binding = SessionBinding::new(storage.progress, storage.sessions);
        ProgressStore::open(fixed_clock(), binding, LearnerId::new("local_cards"))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn deck_covers_completed_lessons_and_is_appended() {
        let generator = Arc::new(DeckGenerator::default());
        let mut store = store().await;
        store.select_language(ProgrammingLanguage::Python).await;
        store
            .complete_quiz(&QuizCompletion {
                language: ProgrammingLanguage::Python,
                lesson: LessonId::new("loops"),
                correct: 3,
                total: 3,
                score: QuizScore::PERFECT,
            })
            .await
            .unwrap();
        store.add_flashcard("Existing", "card").await.unwrap();

        let (count, update) = flow(Arc::clone(&generator))
            .generate(&mut store)
            .await
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(*generator.seen.lock().unwrap(), vec!["Loops".to_string()]);

        let questions: Vec<_> = update
            .current
            .flashcards()
            .iter()
            .map(|card| card.question.as_str())
            .collect();
        assert_eq!(questions, vec!["Existing", "Explain Loops"]);
        assert_eq!(store.snapshot().flashcards().len(), 2);
    }

    #[tokio::test]
    async fn fresh_track_asks_for_fundamentals() {
        let generator = Arc::new(DeckGenerator::default());
        let mut store = store().await;
        store.select_language(ProgrammingLanguage::Go).await;

        let (count, _) = flow(Arc::clone(&generator))
            .generate(&mut store)
            .await
            .unwrap();
        assert_eq!(count, 1);
        assert!(generator.seen.lock().unwrap().is_empty());
        assert_eq!(store.snapshot().flashcards()[0].question, "Explain Go");
    }

    #[tokio::test]
    async fn quota_or_missing_track_leaves_progress_alone() {
        let mut store = store().await;
        let err = flow(Arc::default()).generate(&mut store).await.unwrap_err();
        assert!(matches!(
            err,
            FlashcardFlowError::Progress(ProgressError::NoLanguageSelected)
        ));

        store.select_language(ProgrammingLanguage::Php).await;
        let exhausted = Arc::new(DeckGenerator {
            exhausted: true,
            ..DeckGenerator::default()
        });
        let err = flow(exhausted).generate(&mut store).await.unwrap_err();
        match err {
            FlashcardFlowError::Unavailable { origin, notice } => {
                assert_eq!(origin, ContentOrigin::Degraded);
                assert!(!notice.is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(store.snapshot().flashcards().is_empty());
    }
}
