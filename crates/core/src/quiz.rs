//! Quiz progression: `NotStarted → InProgress → Finished`.
//!
//! The session only knows about questions and answers. Resolving content and
//! recording the completion are done by the services layer.

use thiserror::Error;

use crate::model::{LessonId, ProgrammingLanguage, QuizQuestion, QuizScore};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizError {
    #[error("quiz has no questions")]
    NoQuestions,

    #[error("quiz has not started")]
    NotStarted,

    #[error("quiz already started")]
    AlreadyStarted,

    #[error("current question was already answered")]
    AlreadyAnswered,

    #[error("answer the current question before advancing")]
    NotAnswered,

    #[error("quiz is finished")]
    Finished,

    #[error("choice {choice} is out of range for {options} options")]
    ChoiceOutOfRange { choice: usize, options: usize },
}

/// Feedback for the answer given to the current question, shown before the
/// learner advances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerFeedback {
    pub choice: usize,
    pub is_correct: bool,
    pub correct_index: usize,
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuizState {
    NotStarted,
    InProgress {
        index: usize,
        correct: usize,
        feedback: Option<AnswerFeedback>,
    },
    Finished {
        score: QuizScore,
    },
}

/// Emitted exactly once, when the last question is advanced past.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizCompletion {
    pub language: ProgrammingLanguage,
    pub lesson: LessonId,
    pub correct: usize,
    pub total: usize,
    pub score: QuizScore,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    Next { index: usize },
    Finished(QuizCompletion),
}

/// Integer percentage of correct answers. Halves round up, matching
/// `Math.round` for non-negative values: 1/3 → 33, 2/3 → 67, 1/8 → 13.
#[must_use]
pub fn quiz_score(correct: usize, total: usize) -> QuizScore {
    if total == 0 {
        return QuizScore::clamped(0);
    }
    let correct = correct.min(total);
    QuizScore::clamped((correct * 200 + total) / (total * 2))
}

#[derive(Debug, Clone)]
pub struct QuizSession {
    language: ProgrammingLanguage,
    lesson: LessonId,
    questions: Vec<QuizQuestion>,
    state: QuizState,
}

impl QuizSession {
    #[must_use]
    pub fn new(language: ProgrammingLanguage, lesson: LessonId) -> Self {
        Self {
            language,
            lesson,
            questions: Vec::new(),
            state: QuizState::NotStarted,
        }
    }

    #[must_use]
    pub fn language(&self) -> ProgrammingLanguage {
        self.language
    }

    #[must_use]
    pub fn lesson(&self) -> &LessonId {
        &self.lesson
    }

    #[must_use]
    pub fn state(&self) -> &QuizState {
        &self.state
    }

    #[must_use]
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&QuizQuestion> {
        match self.state {
            QuizState::InProgress { index, .. } => self.questions.get(index),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        matches!(self.state, QuizState::Finished { .. })
    }

    /// Loads the resolved questions and moves to the first one.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::AlreadyStarted` unless the session is `NotStarted`,
    /// and `QuizError::NoQuestions` for an empty set (the session stays
    /// `NotStarted`).
    pub fn start(&mut self, questions: Vec<QuizQuestion>) -> Result<(), QuizError> {
        if !matches!(self.state, QuizState::NotStarted) {
            return Err(QuizError::AlreadyStarted);
        }
        if questions.is_empty() {
            return Err(QuizError::NoQuestions);
        }
        self.questions = questions;
        self.state = QuizState::InProgress {
            index: 0,
            correct: 0,
            feedback: None,
        };
        Ok(())
    }

    /// Submits `choice` for the current question. One answer per question.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::NotStarted`/`QuizError::Finished` outside
    /// `InProgress`, `QuizError::AlreadyAnswered` on a second answer, and
    /// `QuizError::ChoiceOutOfRange` for an index past the options.
    pub fn answer(&mut self, choice: usize) -> Result<&AnswerFeedback, QuizError> {
        if !matches!(self.state, QuizState::InProgress { .. }) {
            return Err(self.not_in_progress());
        }
        let QuizState::InProgress {
            index,
            correct,
            feedback,
        } = &mut self.state
        else {
            return Err(QuizError::NotStarted);
        };
        if feedback.is_some() {
            return Err(QuizError::AlreadyAnswered);
        }
        let question = &self.questions[*index];
        let options = question.options().len();
        if choice >= options {
            return Err(QuizError::ChoiceOutOfRange { choice, options });
        }

        let is_correct = question.is_correct(choice);
        if is_correct {
            *correct += 1;
        }
        Ok(&*feedback.insert(AnswerFeedback {
            choice,
            is_correct,
            correct_index: question.correct_index(),
            explanation: question.explanation().to_string(),
        }))
    }

    /// Moves past the answered question, finishing after the last one.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::NotAnswered` if the current question has no answer
    /// yet, and `QuizError::NotStarted`/`QuizError::Finished` outside
    /// `InProgress`.
    pub fn advance(&mut self) -> Result<Advance, QuizError> {
        let QuizState::InProgress {
            index,
            correct,
            feedback,
        } = &self.state
        else {
            return Err(self.not_in_progress());
        };
        if feedback.is_none() {
            return Err(QuizError::NotAnswered);
        }

        let (index, correct) = (*index, *correct);
        let total = self.questions.len();
        if index + 1 < total {
            self.state = QuizState::InProgress {
                index: index + 1,
                correct,
                feedback: None,
            };
            return Ok(Advance::Next { index: index + 1 });
        }

        let score = quiz_score(correct, total);
        self.state = QuizState::Finished { score };
        Ok(Advance::Finished(QuizCompletion {
            language: self.language,
            lesson: self.lesson.clone(),
            correct,
            total,
            score,
        }))
    }

    fn not_in_progress(&self) -> QuizError {
        match self.state {
            QuizState::Finished { .. } => QuizError::Finished,
            _ => QuizError::NotStarted,
        }
    }
}
