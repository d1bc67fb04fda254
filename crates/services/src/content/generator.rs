use async_trait::async_trait;
use serde::Deserialize;
use tutor_core::model::{
    ChatMode, ChatTurn, FlashcardDraft, ProgrammingLanguage, QuizQuestion, TutorSettings,
};

use crate::error::GeneratorError;

/// How a generated lesson should be pitched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StyleHint {
    #[default]
    Standard,
    /// Explain like I'm five: analogies, no jargon.
    Eli5,
}

impl StyleHint {
    #[must_use]
    pub fn from_settings(settings: &TutorSettings) -> Self {
        if settings.eli5_mode() {
            StyleHint::Eli5
        } else {
            StyleHint::Standard
        }
    }
}

/// Produces lesson text and quiz questions on demand.
#[async_trait]
pub trait RemoteGenerator: Send + Sync {
    /// Markdown lesson body for `topic`.
    ///
    /// # Errors
    ///
    /// Returns `GeneratorError::QuotaExhausted` when the provider is out of
    /// quota; any other variant is a generic failure.
    async fn generate_lesson(
        &self,
        language: ProgrammingLanguage,
        topic: &str,
        style: StyleHint,
    ) -> Result<String, GeneratorError>;

    /// Validated multiple-choice questions for `topic`.
    ///
    /// # Errors
    ///
    /// Same classification as [`generate_lesson`](Self::generate_lesson).
    async fn generate_quiz(
        &self,
        language: ProgrammingLanguage,
        topic: &str,
    ) -> Result<Vec<QuizQuestion>, GeneratorError>;

    /// Next tutor reply in a conversation. `history` holds the earlier turns,
    /// oldest first, and excludes `input`.
    ///
    /// Generators without a conversational backend return
    /// `GeneratorError::Disabled`.
    ///
    /// # Errors
    ///
    /// Same classification as [`generate_lesson`](Self::generate_lesson).
    async fn chat(
        &self,
        _language: Option<ProgrammingLanguage>,
        _mode: &ChatMode,
        _history: &[ChatTurn],
        _input: &str,
    ) -> Result<String, GeneratorError> {
        Err(GeneratorError::Disabled)
    }

    /// Review cards for `language`, drawn from `topics` when any are given.
    ///
    /// # Errors
    ///
    /// Same classification as [`generate_lesson`](Self::generate_lesson).
    /// Generators that cannot produce cards return `GeneratorError::Disabled`.
    async fn generate_flashcards(
        &self,
        _language: ProgrammingLanguage,
        _topics: &[String],
    ) -> Result<Vec<FlashcardDraft>, GeneratorError> {
        Err(GeneratorError::Disabled)
    }
}

/// Wire shape the provider is asked to produce for each question.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawQuestion {
    question: String,
    options: Vec<String>,
    correct_answer_index: usize,
    #[serde(default)]
    explanation: String,
}

/// Parses a provider reply into typed questions.
///
/// Accepts a bare JSON array, optionally wrapped in a Markdown code fence.
/// The whole set is rejected if any question fails validation.
///
/// # Errors
///
/// Returns `GeneratorError::Malformed` for invalid JSON, an empty set, or a
/// question that fails validation.
pub fn parse_quiz(raw: &str) -> Result<Vec<QuizQuestion>, GeneratorError> {
    let body = strip_code_fence(raw);
    let parsed: Vec<RawQuestion> =
        serde_json::from_str(body).map_err(|err| GeneratorError::Malformed(err.to_string()))?;
    if parsed.is_empty() {
        return Err(GeneratorError::Malformed("no questions".into()));
    }

    parsed
        .into_iter()
        .enumerate()
        .map(|(position, raw)| {
            QuizQuestion::new(
                raw.question,
                raw.options,
                raw.correct_answer_index,
                raw.explanation,
            )
            .map_err(|err| GeneratorError::Malformed(format!("question {}: {err}", position + 1)))
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct RawCard {
    question: String,
    answer: String,
}

/// Parses a provider reply into flashcard drafts, with the same framing and
/// all-or-nothing rules as [`parse_quiz`].
///
/// # Errors
///
/// Returns `GeneratorError::Malformed` for invalid JSON, an empty set, or a
/// card with a blank side.
pub fn parse_flashcards(raw: &str) -> Result<Vec<FlashcardDraft>, GeneratorError> {
    let body = strip_code_fence(raw);
    let parsed: Vec<RawCard> =
        serde_json::from_str(body).map_err(|err| GeneratorError::Malformed(err.to_string()))?;
    if parsed.is_empty() {
        return Err(GeneratorError::Malformed("no flashcards".into()));
    }

    parsed
        .into_iter()
        .enumerate()
        .map(|(position, raw)| {
            FlashcardDraft::new(raw.question, raw.answer)
                .map_err(|err| GeneratorError::Malformed(format!("card {}: {err}", position + 1)))
        })
        .collect()
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (`json`) on the opening fence line.
    let rest = rest.split_once('\n').map_or("", |(_, body)| body);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}
