use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

use crate::model::ids::{AchievementId, FlashcardId, LessonId, SnippetId};
use crate::model::language::ProgrammingLanguage;
use crate::model::lesson::{Lesson, lessons};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Mutations rejected at the progress boundary. A rejected mutation leaves the
/// snapshot untouched.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("no language track is selected")]
    NoLanguageSelected,

    #[error("quiz result for {requested} but the active track is {selected}")]
    LanguageMismatch {
        selected: ProgrammingLanguage,
        requested: ProgrammingLanguage,
    },

    #[error("lesson {lesson} is not part of the {language} catalog")]
    UnknownLesson {
        language: ProgrammingLanguage,
        lesson: LessonId,
    },

    #[error("quiz score must be between 0 and 100, got {0}")]
    InvalidScore(u32),

    #[error("snippet title and code cannot be empty")]
    EmptySnippet,

    #[error("flashcard question and answer cannot be empty")]
    EmptyFlashcard,
}

//
// ─── QUIZ SCORE ────────────────────────────────────────────────────────────────
//

/// Integer percentage in `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct QuizScore(u8);

impl QuizScore {
    pub const PERFECT: QuizScore = QuizScore(100);

    /// # Errors
    ///
    /// Returns `ProgressError::InvalidScore` if `value > 100`.
    pub fn new(value: u32) -> Result<Self, ProgressError> {
        u8::try_from(value)
            .ok()
            .filter(|v| *v <= 100)
            .map(Self)
            .ok_or(ProgressError::InvalidScore(value))
    }

    /// Saturates values above 100.
    #[must_use]
    pub fn clamped(value: usize) -> Self {
        Self(u8::try_from(value.min(100)).unwrap_or(100))
    }

    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }

    #[must_use]
    pub fn is_perfect(self) -> bool {
        self == Self::PERFECT
    }
}

impl TryFrom<u32> for QuizScore {
    type Error = ProgressError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<QuizScore> for u32 {
    fn from(score: QuizScore) -> Self {
        u32::from(score.0)
    }
}

//
// ─── PER-LANGUAGE PROGRESS ─────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LanguageProgress {
    completed_lessons: BTreeSet<LessonId>,
    quiz_scores: BTreeMap<LessonId, QuizScore>,
}

impl LanguageProgress {
    #[must_use]
    pub fn completed_lessons(&self) -> &BTreeSet<LessonId> {
        &self.completed_lessons
    }

    #[must_use]
    pub fn quiz_scores(&self) -> &BTreeMap<LessonId, QuizScore> {
        &self.quiz_scores
    }

    #[must_use]
    pub fn is_completed(&self, lesson: &LessonId) -> bool {
        self.completed_lessons.contains(lesson)
    }

    #[must_use]
    pub fn score(&self, lesson: &LessonId) -> Option<QuizScore> {
        self.quiz_scores.get(lesson).copied()
    }
}

//
// ─── STREAK ────────────────────────────────────────────────────────────────────
//

/// Consecutive-day login streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Streak {
    current: u32,
    last_login: Option<DateTime<Utc>>,
}

impl Streak {
    #[must_use]
    pub fn current(&self) -> u32 {
        self.current
    }

    #[must_use]
    pub fn last_login(&self) -> Option<DateTime<Utc>> {
        self.last_login
    }

    /// Same UTC day keeps the count, the following day extends it, any
    /// longer gap (or a clock that went backwards) restarts at 1.
    #[must_use]
    fn touched(self, now: DateTime<Utc>) -> Self {
        let current = match self.last_login {
            None => 1,
            Some(last) => {
                let gap = (now.date_naive() - last.date_naive()).num_days();
                match gap {
                    0 => self.current.max(1),
                    1 => self.current.saturating_add(1),
                    _ => 1,
                }
            }
        };
        Self {
            current,
            last_login: Some(now),
        }
    }
}

//
// ─── USER COLLECTIONS ──────────────────────────────────────────────────────────
//

/// A code recipe the learner saved from a lesson.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedSnippet {
    pub id: SnippetId,
    pub title: String,
    pub code: String,
    pub language: ProgrammingLanguage,
    pub saved_at: DateTime<Utc>,
}

impl SavedSnippet {
    /// # Errors
    ///
    /// Returns `ProgressError::EmptySnippet` if the title or code is blank.
    pub fn new(
        title: impl Into<String>,
        code: impl Into<String>,
        language: ProgrammingLanguage,
        saved_at: DateTime<Utc>,
    ) -> Result<Self, ProgressError> {
        let title = title.into().trim().to_string();
        let code = code.into();
        if title.is_empty() || code.trim().is_empty() {
            return Err(ProgressError::EmptySnippet);
        }
        Ok(Self {
            id: SnippetId::generate(),
            title,
            code,
            language,
            saved_at,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flashcard {
    pub id: FlashcardId,
    pub question: String,
    pub answer: String,
    pub next_review: DateTime<Utc>,
}

impl Flashcard {
    /// # Errors
    ///
    /// Returns `ProgressError::EmptyFlashcard` if either side is blank.
    pub fn new(
        question: impl Into<String>,
        answer: impl Into<String>,
        next_review: DateTime<Utc>,
    ) -> Result<Self, ProgressError> {
        let question = question.into().trim().to_string();
        let answer = answer.into().trim().to_string();
        if question.is_empty() || answer.is_empty() {
            return Err(ProgressError::EmptyFlashcard);
        }
        Ok(Self {
            id: FlashcardId::generate(),
            question,
            answer,
            next_review,
        })
    }
}

/// Question and answer text of a card that has not been filed yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashcardDraft {
    question: String,
    answer: String,
}

impl FlashcardDraft {
    /// # Errors
    ///
    /// Returns `ProgressError::EmptyFlashcard` if either side is blank.
    pub fn new(
        question: impl Into<String>,
        answer: impl Into<String>,
    ) -> Result<Self, ProgressError> {
        let question = question.into().trim().to_string();
        let answer = answer.into().trim().to_string();
        if question.is_empty() || answer.is_empty() {
            return Err(ProgressError::EmptyFlashcard);
        }
        Ok(Self { question, answer })
    }

    #[must_use]
    pub fn question(&self) -> &str {
        &self.question
    }

    #[must_use]
    pub fn answer(&self) -> &str {
        &self.answer
    }

    /// Files the draft as a card due at `next_review`.
    #[must_use]
    pub fn into_card(self, next_review: DateTime<Utc>) -> Flashcard {
        Flashcard {
            id: FlashcardId::generate(),
            question: self.question,
            answer: self.answer,
            next_review,
        }
    }
}

//
// ─── USER PROGRESS ─────────────────────────────────────────────────────────────
//

/// The canonical progress record of one learner.
///
/// Every mutation consumes the snapshot and returns the next one, so callers
/// holding an earlier snapshot never observe a change.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserProgress {
    selected_language: Option<ProgrammingLanguage>,
    language_data: BTreeMap<ProgrammingLanguage, LanguageProgress>,
    unlocked_achievements: BTreeSet<AchievementId>,
    streak: Streak,
    saved_snippets: Vec<SavedSnippet>,
    flashcards: Vec<Flashcard>,
}

/// Dashboard view of a single track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackSummary {
    pub language: ProgrammingLanguage,
    pub completed: usize,
    pub total: usize,
    pub percent_complete: u8,
    /// First lesson not yet completed; `None` once the track is finished.
    pub next_lesson: Option<&'static Lesson>,
}

impl UserProgress {
    #[must_use]
    pub fn selected_language(&self) -> Option<ProgrammingLanguage> {
        self.selected_language
    }

    #[must_use]
    pub fn language_data(&self) -> &BTreeMap<ProgrammingLanguage, LanguageProgress> {
        &self.language_data
    }

    #[must_use]
    pub fn language(&self, language: ProgrammingLanguage) -> Option<&LanguageProgress> {
        self.language_data.get(&language)
    }

    #[must_use]
    pub fn unlocked_achievements(&self) -> &BTreeSet<AchievementId> {
        &self.unlocked_achievements
    }

    #[must_use]
    pub fn has_achievement(&self, id: &str) -> bool {
        self.unlocked_achievements.contains(&AchievementId::new(id))
    }

    #[must_use]
    pub fn streak(&self) -> Streak {
        self.streak
    }

    #[must_use]
    pub fn saved_snippets(&self) -> &[SavedSnippet] {
        &self.saved_snippets
    }

    /// Snippets ordered for the cookbook view.
    #[must_use]
    pub fn snippets_newest_first(&self) -> Vec<&SavedSnippet> {
        let mut snippets: Vec<_> = self.saved_snippets.iter().collect();
        snippets.sort_by(|a, b| b.saved_at.cmp(&a.saved_at));
        snippets
    }

    #[must_use]
    pub fn flashcards(&self) -> &[Flashcard] {
        &self.flashcards
    }

    /// Completed lessons summed over every track.
    #[must_use]
    pub fn total_completed_lessons(&self) -> usize {
        self.language_data
            .values()
            .map(|data| data.completed_lessons.len())
            .sum()
    }

    /// Number of tracks the learner has started, including ones with no
    /// completed lessons yet.
    #[must_use]
    pub fn started_languages(&self) -> usize {
        self.language_data.len()
    }

    #[must_use]
    pub fn language_summary(&self, language: ProgrammingLanguage) -> TrackSummary {
        let catalog = lessons(language);
        let data = self.language_data.get(&language);
        let is_done = |lesson: &Lesson| data.is_some_and(|d| d.is_completed(&lesson.lesson_id()));
        let completed = catalog.iter().filter(|lesson| is_done(lesson)).count();
        let total = catalog.len();
        let percent_complete = if total == 0 {
            0
        } else {
            u8::try_from((completed * 200 + total) / (total * 2)).unwrap_or(100)
        };
        let next_lesson = catalog.iter().find(|lesson| !is_done(lesson));

        TrackSummary {
            language,
            completed,
            total,
            percent_complete,
            next_lesson,
        }
    }

    /// Makes `language` the active track, creating its entry on first use.
    #[must_use]
    pub fn select_language(mut self, language: ProgrammingLanguage) -> Self {
        self.selected_language = Some(language);
        self.language_data.entry(language).or_default();
        self
    }

    /// Marks `lesson` completed on the active track and stores its score,
    /// overwriting any earlier attempt.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::NoLanguageSelected` when no track is active,
    /// `ProgressError::LanguageMismatch` when `language` is not the active
    /// track, and `ProgressError::UnknownLesson` for ids outside the catalog.
    pub fn record_quiz_result(
        mut self,
        language: ProgrammingLanguage,
        lesson: &LessonId,
        score: QuizScore,
    ) -> Result<Self, ProgressError> {
        let selected = self
            .selected_language
            .ok_or(ProgressError::NoLanguageSelected)?;
        if selected != language {
            return Err(ProgressError::LanguageMismatch {
                selected,
                requested: language,
            });
        }
        if Lesson::find(language, lesson).is_none() {
            return Err(ProgressError::UnknownLesson {
                language,
                lesson: lesson.clone(),
            });
        }

        let data = self.language_data.entry(language).or_default();
        data.completed_lessons.insert(lesson.clone());
        data.quiz_scores.insert(lesson.clone(), score);
        Ok(self)
    }

    /// Adds achievement ids. Existing ids are kept; nothing is ever removed.
    #[must_use]
    pub fn grant_achievements(mut self, ids: impl IntoIterator<Item = AchievementId>) -> Self {
        self.unlocked_achievements.extend(ids);
        self
    }

    #[must_use]
    pub fn record_login(mut self, now: DateTime<Utc>) -> Self {
        self.streak = self.streak.touched(now);
        self
    }

    #[must_use]
    pub fn add_snippet(mut self, snippet: SavedSnippet) -> Self {
        self.saved_snippets.push(snippet);
        self
    }

    #[must_use]
    pub fn delete_snippet(mut self, id: SnippetId) -> Self {
        self.saved_snippets.retain(|snippet| snippet.id != id);
        self
    }

    #[must_use]
    pub fn add_flashcards(mut self, cards: impl IntoIterator<Item = Flashcard>) -> Self {
        self.flashcards.extend(cards);
        self
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
