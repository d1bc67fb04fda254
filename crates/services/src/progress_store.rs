//! Serialized, copy-on-write mutation of one learner's progress.
//!
//! Every update clones the current snapshot, transforms the clone, merges in
//! achievements and hands the result to the session binding. Snapshots handed
//! out earlier are never touched.

use std::collections::BTreeSet;
use std::sync::Arc;

use storage::repository::StorageError;
use tutor_core::achievements::{evaluate, newly_unlocked};
use tutor_core::model::{
    AchievementId, Flashcard, FlashcardDraft, FlashcardId, LearnerId, LoginProvider,
    ProgrammingLanguage, ProgressError, SavedSnippet, SnippetId, UserProgress,
};
use tutor_core::quiz::QuizCompletion;
use tutor_core::Clock;

use crate::session_binding::{PersistOutcome, SessionBinding};

/// What one committed update changed.
#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    pub previous: Arc<UserProgress>,
    pub current: Arc<UserProgress>,
    /// Ids unlocked by this update: `current` minus `previous`.
    pub newly_unlocked: BTreeSet<AchievementId>,
    pub persisted: PersistOutcome,
}

pub struct ProgressStore {
    clock: Clock,
    learner: LearnerId,
    binding: SessionBinding,
    current: Arc<UserProgress>,
}

impl ProgressStore {
    /// Opens the store for `learner`, starting from their stored progress or
    /// defaults when nothing is stored.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if stored progress exists but cannot be read.
    pub async fn open(
        clock: Clock,
        mut binding: SessionBinding,
        learner: LearnerId,
    ) -> Result<Self, StorageError> {
        let progress = binding.load(&learner).await?.unwrap_or_default();
        Ok(Self {
            clock,
            learner,
            binding,
            current: Arc::new(progress),
        })
    }

    /// Logs in through `binding` and records the login against the streak.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the login itself cannot be recorded.
    pub async fn login(
        clock: Clock,
        mut binding: SessionBinding,
        provider: LoginProvider,
        username: &str,
    ) -> Result<(Self, ProgressUpdate), StorageError> {
        let (learner, progress) = binding.login(provider, username).await?;
        let mut store = Self {
            clock,
            learner,
            binding,
            current: Arc::new(progress),
        };
        let update = store.record_login().await;
        Ok((store, update))
    }

    /// Reopens the store for whoever is marked as the active session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the session or progress cannot be read.
    pub async fn resume(clock: Clock, binding: SessionBinding) -> Result<Option<Self>, StorageError> {
        match binding.active_learner().await? {
            Some(learner) => Ok(Some(Self::open(clock, binding, learner).await?)),
            None => Ok(None),
        }
    }

    /// Ends the active session and returns the binding for the next login.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the session row cannot be cleared.
    pub async fn logout(self) -> Result<SessionBinding, StorageError> {
        let mut binding = self.binding;
        binding.logout().await?;
        tracing::info!(learner = %self.learner, "learner logged out");
        Ok(binding)
    }

    #[must_use]
    pub fn learner(&self) -> &LearnerId {
        &self.learner
    }

    /// The latest committed snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<UserProgress> {
        Arc::clone(&self.current)
    }

    /// Applies `transform` to a copy of the current snapshot and commits it.
    pub async fn update<F>(&mut self, transform: F) -> ProgressUpdate
    where
        F: FnOnce(UserProgress) -> UserProgress,
    {
        let candidate = transform(UserProgress::clone(&self.current));
        self.commit(candidate).await
    }

    /// Like [`update`](Self::update) for transforms that can reject the
    /// mutation. A rejected transform leaves the store untouched.
    ///
    /// # Errors
    ///
    /// Returns the `ProgressError` produced by `transform`.
    pub async fn try_update<F>(&mut self, transform: F) -> Result<ProgressUpdate, ProgressError>
    where
        F: FnOnce(UserProgress) -> Result<UserProgress, ProgressError>,
    {
        match transform(UserProgress::clone(&self.current)) {
            Ok(candidate) => Ok(self.commit(candidate).await),
            Err(err) => {
                tracing::error!(learner = %self.learner, error = %err, "rejected progress update");
                Err(err)
            }
        }
    }

    pub async fn select_language(&mut self, language: ProgrammingLanguage) -> ProgressUpdate {
        self.update(|progress| progress.select_language(language))
            .await
    }

    /// Records a finished quiz on the active track.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError` if no track is active, the quiz belongs to a
    /// different track, or the lesson is not in the catalog.
    pub async fn complete_quiz(
        &mut self,
        completion: &QuizCompletion,
    ) -> Result<ProgressUpdate, ProgressError> {
        self.try_update(|progress| {
            progress.record_quiz_result(completion.language, &completion.lesson, completion.score)
        })
        .await
    }

    pub async fn record_login(&mut self) -> ProgressUpdate {
        let now = self.clock.now();
        self.update(|progress| progress.record_login(now)).await
    }

    /// Saves a snippet to the cookbook and returns its id with the update.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::EmptySnippet` if the title or code is blank.
    pub async fn save_snippet(
        &mut self,
        title: &str,
        code: &str,
        language: ProgrammingLanguage,
    ) -> Result<(SnippetId, ProgressUpdate), ProgressError> {
        let snippet = SavedSnippet::new(title, code, language, self.clock.now())?;
        let id = snippet.id;
        let update = self.update(|progress| progress.add_snippet(snippet)).await;
        Ok((id, update))
    }

    pub async fn delete_snippet(&mut self, id: SnippetId) -> ProgressUpdate {
        self.update(|progress| progress.delete_snippet(id)).await
    }

    /// Adds a flashcard due for review immediately.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::EmptyFlashcard` if either side is blank.
    pub async fn add_flashcard(
        &mut self,
        question: &str,
        answer: &str,
    ) -> Result<(FlashcardId, ProgressUpdate), ProgressError> {
        let card = Flashcard::new(question, answer, self.clock.now())?;
        let id = card.id;
        let update = self.update(|progress| progress.add_flashcards([card])).await;
        Ok((id, update))
    }

    /// Appends a batch of drafts, all due for review immediately.
    pub async fn add_flashcards(&mut self, drafts: Vec<FlashcardDraft>) -> ProgressUpdate {
        let now = self.clock.now();
        let cards = drafts.into_iter().map(move |draft| draft.into_card(now));
        self.update(|progress| progress.add_flashcards(cards)).await
    }

    /// Clears every field of the learner's progress, achievements included.
    pub async fn reset(&mut self) -> ProgressUpdate {
        let previous = Arc::clone(&self.current);
        let current = Arc::new(UserProgress::default());
        self.current = Arc::clone(&current);
        tracing::info!(learner = %self.learner, "progress reset");
        let persisted = self.binding.persist(&self.learner, &current).await;
        ProgressUpdate {
            previous,
            current,
            newly_unlocked: BTreeSet::new(),
            persisted,
        }
    }

    async fn commit(&mut self, candidate: UserProgress) -> ProgressUpdate {
        let previous = Arc::clone(&self.current);
        let unlocked = evaluate(&candidate);
        let next = candidate
            .grant_achievements(previous.unlocked_achievements().iter().cloned())
            .grant_achievements(unlocked);
        let newly = newly_unlocked(previous.unlocked_achievements(), next.unlocked_achievements());
        if !newly.is_empty() {
            tracing::info!(learner = %self.learner, unlocked = ?newly, "achievements unlocked");
        }

        let current = Arc::new(next);
        self.current = Arc::clone(&current);
        let persisted = self.binding.persist(&self.learner, &current).await;
        ProgressUpdate {
            previous,
            current,
            newly_unlocked: newly,
            persisted,
        }
    }
}
