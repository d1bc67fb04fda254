use std::env;

use async_trait::async_trait;
use rand::Rng;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tutor_core::model::{
    ChatMode, ChatRole, ChatTurn, FlashcardDraft, ProgrammingLanguage, QuizQuestion,
    TutorSettings,
};

use crate::content::generator::{RemoteGenerator, StyleHint, parse_flashcards, parse_quiz};
use crate::error::GeneratorError;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Markers providers put in error bodies when the account is out of quota.
const QUOTA_MARKERS: &[&str] = &["RESOURCE_EXHAUSTED", "quota"];

/// Cards requested per generated deck.
const FLASHCARD_BATCH: usize = 5;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratorConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl GeneratorConfig {
    #[must_use]
    pub fn from_env() -> Option<Self> {
        Self::resolve(&TutorSettings::default())
    }

    /// Environment variables win over persisted settings, field by field.
    /// Without an API key from either source the generator stays disabled.
    #[must_use]
    pub fn resolve(settings: &TutorSettings) -> Option<Self> {
        let api_key = non_blank_env("CODESAGE_AI_API_KEY")
            .or_else(|| settings.api_key().map(str::to_string))?;
        let base_url = non_blank_env("CODESAGE_AI_BASE_URL")
            .or_else(|| settings.api_base_url().map(str::to_string))
            .unwrap_or_else(|| DEFAULT_BASE_URL.into());
        let model = non_blank_env("CODESAGE_AI_MODEL")
            .or_else(|| settings.api_model().map(str::to_string))
            .unwrap_or_else(|| DEFAULT_MODEL.into());
        Some(Self {
            base_url,
            api_key,
            model,
        })
    }
}

fn non_blank_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// `RemoteGenerator` backed by an OpenAI-compatible chat completions API.
#[derive(Clone)]
pub struct ChatGenerator {
    client: Client,
    config: Option<GeneratorConfig>,
}

impl ChatGenerator {
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(GeneratorConfig::from_env())
    }

    #[must_use]
    pub fn new(config: Option<GeneratorConfig>) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.is_some()
    }

    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        temperature: f32,
    ) -> Result<String, GeneratorError> {
        let config = self.config.as_ref().ok_or(GeneratorError::Disabled)?;

        let url = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));
        let payload = ChatRequest {
            model: config.model.clone(),
            messages,
            temperature,
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(&config.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(GeneratorError::QuotaExhausted);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if QUOTA_MARKERS.iter().any(|marker| body.contains(marker)) {
                return Err(GeneratorError::QuotaExhausted);
            }
            return Err(GeneratorError::HttpStatus(status));
        }

        let body: ChatResponse = response.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or(GeneratorError::EmptyResponse)?;

        Ok(content)
    }
}

#[async_trait]
impl RemoteGenerator for ChatGenerator {
    async fn generate_lesson(
        &self,
        language: ProgrammingLanguage,
        topic: &str,
        style: StyleHint,
    ) -> Result<String, GeneratorError> {
        tracing::debug!(language = %language, topic, ?style, "generating lesson");
        self.complete(vec![ChatMessage::user(lesson_prompt(language, topic, style))], 0.7)
            .await
    }

    async fn generate_quiz(
        &self,
        language: ProgrammingLanguage,
        topic: &str,
    ) -> Result<Vec<QuizQuestion>, GeneratorError> {
        let count = quiz_size();
        tracing::debug!(language = %language, topic, count, "generating quiz");
        let raw = self
            .complete(vec![ChatMessage::user(quiz_prompt(language, topic, count))], 0.2)
            .await?;
        parse_quiz(&raw)
    }

    async fn chat(
        &self,
        language: Option<ProgrammingLanguage>,
        mode: &ChatMode,
        history: &[ChatTurn],
        input: &str,
    ) -> Result<String, GeneratorError> {
        tracing::debug!(%mode, turns = history.len(), "asking tutor");
        self.complete(conversation(language, mode, history, input), 0.8)
            .await
    }

    async fn generate_flashcards(
        &self,
        language: ProgrammingLanguage,
        topics: &[String],
    ) -> Result<Vec<FlashcardDraft>, GeneratorError> {
        tracing::debug!(language = %language, topics = topics.len(), "generating flashcards");
        let prompt = flashcards_prompt(language, topics, FLASHCARD_BATCH);
        let raw = self.complete(vec![ChatMessage::user(prompt)], 0.5).await?;
        parse_flashcards(&raw)
    }
}

/// Remote quizzes vary in length between five and ten questions.
fn quiz_size() -> usize {
    rand::rng().random_range(5..=10)
}

fn lesson_prompt(language: ProgrammingLanguage, topic: &str, style: StyleHint) -> String {
    let pitch = match style {
        StyleHint::Standard => {
            "Write for a beginner programmer. Be clear and precise and show idiomatic code."
        }
        StyleHint::Eli5 => {
            "Explain it like I'm five: use everyday analogies, avoid jargon and keep code tiny."
        }
    };
    format!(
        "Write a short lesson in Markdown about \"{topic}\" in {language}. {pitch} \
         Include at least one fenced code example and finish with a one-line summary."
    )
}

fn quiz_prompt(language: ProgrammingLanguage, topic: &str, count: usize) -> String {
    format!(
        "Create {count} multiple-choice questions about \"{topic}\" in {language}. \
         Reply with only a JSON array. Each element must have the fields \
         \"question\" (string), \"options\" (array of 4 strings), \
         \"correctAnswerIndex\" (zero-based integer) and \"explanation\" (string)."
    )
}

fn chat_instructions(language: Option<ProgrammingLanguage>, mode: &ChatMode) -> String {
    let language = language.map_or("programming", ProgrammingLanguage::display_name);
    match mode {
        ChatMode::Lesson { title } => format!(
            "You are \"CodeSage\", a friendly and patient programming tutor for absolute \
             beginners. The student is learning {language}, specifically the topic \"{title}\". \
             Use simple words and real-life analogies. When asked for code, give short, \
             well-commented snippets and encourage the student to try them. If a question is \
             far beyond the fundamentals, say it is an advanced topic and steer back to the \
             basics. Always be encouraging."
        ),
        ChatMode::Interviewer => format!(
            "You are \"CodeSage\", hosting a mock technical interview on {language}. Ask one \
             question at a time, starting easy and getting harder as the candidate does well. \
             After each answer give brief, honest feedback before the next question. Stay in \
             character as the interviewer."
        ),
    }
}

/// System instructions, then the earlier turns, then the new input.
fn conversation(
    language: Option<ProgrammingLanguage>,
    mode: &ChatMode,
    history: &[ChatTurn],
    input: &str,
) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage {
        role: "system",
        content: chat_instructions(language, mode),
    });
    messages.extend(history.iter().map(|turn| ChatMessage {
        role: match turn.role {
            ChatRole::User => "user",
            ChatRole::Tutor => "assistant",
        },
        content: turn.content.clone(),
    }));
    messages.push(ChatMessage::user(input.to_string()));
    messages
}

fn flashcards_prompt(language: ProgrammingLanguage, topics: &[String], count: usize) -> String {
    let scope = if topics.is_empty() {
        "beginner fundamentals".to_string()
    } else {
        topics.join(", ")
    };
    format!(
        "Create {count} study flashcards for a beginner learning {language}, covering: {scope}. \
         Reply with only a JSON array. Each element must have the fields \
         \"question\" (string) and \"answer\" (string, one or two sentences)."
    )
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

impl ChatMessage {
    fn user(content: String) -> Self {
        Self {
            role: "user",
            content,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tutor_core::model::TutorSettingsDraft;

    #[tokio::test]
    async fn disabled_generator_fails_generically() {
        let generator = ChatGenerator::new(None);
        assert!(!generator.enabled());

        let err = generator
            .generate_lesson(ProgrammingLanguage::Go, "Loops", StyleHint::Standard)
            .await
            .unwrap_err();
        assert!(matches!(err, GeneratorError::Disabled));
        assert!(!err.is_quota_exhausted());
    }

    #[test]
    fn settings_supply_config_when_env_is_silent() {
        if env::var("CODESAGE_AI_API_KEY").is_ok() {
            return;
        }
        assert!(GeneratorConfig::resolve(&TutorSettings::default()).is_none());

        let settings = TutorSettingsDraft {
            api_key: Some("sk-test".into()),
            ..TutorSettingsDraft::new()
        }
        .validate()
        .unwrap();
        let config = GeneratorConfig::resolve(&settings).unwrap();
        assert_eq!(config.api_key, "sk-test");
        if env::var("CODESAGE_AI_MODEL").is_err() {
            assert_eq!(config.model, DEFAULT_MODEL);
        }
    }

    #[test]
    fn quiz_size_stays_in_range() {
        for _ in 0..50 {
            assert!((5..=10).contains(&quiz_size()));
        }
    }

    #[test]
    fn prompts_mention_topic_and_shape() {
        let eli5 = lesson_prompt(ProgrammingLanguage::Cpp, "Pointers", StyleHint::Eli5);
        assert!(eli5.contains("\"Pointers\" in C/C++"));
        assert!(eli5.contains("like I'm five"));

        let quiz = quiz_prompt(ProgrammingLanguage::Rust, "Loops", 7);
        assert!(quiz.starts_with("Create 7 "));
        assert!(quiz.contains("correctAnswerIndex"));
    }

    #[test]
    fn conversation_maps_roles_after_instructions() {
        let history = [
            ChatTurn::tutor("Ready to start?"),
            ChatTurn::user("Yes"),
        ];
        let messages = conversation(
            Some(ProgrammingLanguage::Java),
            &ChatMode::Interviewer,
            &history,
            "Ask me something",
        );

        let roles: Vec<_> = messages.iter().map(|message| message.role).collect();
        assert_eq!(roles, vec!["system", "assistant", "user", "user"]);
        assert!(messages[0].content.contains("mock technical interview on Java"));
        assert_eq!(messages[3].content, "Ask me something");

        let lesson = chat_instructions(
            None,
            &ChatMode::Lesson {
                title: "Loops".into(),
            },
        );
        assert!(lesson.contains("learning programming, specifically the topic \"Loops\""));
    }

    #[test]
    fn flashcard_prompt_lists_topics() {
        let topics = vec!["Variables".to_string(), "Loops".to_string()];
        let prompt = flashcards_prompt(ProgrammingLanguage::Python, &topics, 5);
        assert!(prompt.starts_with("Create 5 study flashcards"));
        assert!(prompt.contains("covering: Variables, Loops"));
        assert!(flashcards_prompt(ProgrammingLanguage::Python, &[], 5).contains("fundamentals"));
    }

    #[tokio::test]
    async fn disabled_generator_refuses_chat() {
        let err = ChatGenerator::new(None)
            .chat(None, &ChatMode::Interviewer, &[], "hi")
            .await
            .unwrap_err();
        assert!(matches!(err, GeneratorError::Disabled));
    }
}
