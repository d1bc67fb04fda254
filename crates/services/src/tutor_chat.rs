use std::sync::Arc;

use tutor_core::model::{ChatMode, ChatTurn, ContentArtifact, ProgrammingLanguage};

use crate::content::ContentResolver;
use crate::error::TutorChatError;

/// One conversation with the tutor, either about a lesson or as a mock
/// interview.
///
/// The transcript only keeps exchanges that got a reply, so a degraded or
/// failed turn can be retried without duplicating the learner's message.
pub struct TutorChat {
    resolver: Arc<ContentResolver>,
    language: Option<ProgrammingLanguage>,
    mode: ChatMode,
    history: Vec<ChatTurn>,
}

impl TutorChat {
    #[must_use]
    pub fn new(
        resolver: Arc<ContentResolver>,
        language: Option<ProgrammingLanguage>,
        mode: ChatMode,
    ) -> Self {
        let mut chat = Self {
            resolver,
            language,
            mode,
            history: Vec::new(),
        };
        chat.reset();
        chat
    }

    #[must_use]
    pub fn mode(&self) -> &ChatMode {
        &self.mode
    }

    /// Transcript so far, oldest first.
    #[must_use]
    pub fn history(&self) -> &[ChatTurn] {
        &self.history
    }

    /// Drops the transcript, keeping the mode's opening line.
    pub fn reset(&mut self) {
        self.history.clear();
        if let Some(greeting) = self.mode.greeting(self.language) {
            self.history.push(ChatTurn::tutor(greeting));
        }
    }

    /// Sends `input` and returns the tutor's reply artifact.
    ///
    /// # Errors
    ///
    /// Returns `TutorChatError::EmptyMessage` for blank input.
    pub async fn send(&mut self, input: &str) -> Result<ContentArtifact<String>, TutorChatError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(TutorChatError::EmptyMessage);
        }

        let reply = self
            .resolver
            .chat(self.language, &self.mode, &self.history, input)
            .await;
        if let Some(text) = reply.payload() {
            self.history.push(ChatTurn::user(input));
            self.history.push(ChatTurn::tutor(text.clone()));
        }
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tutor_core::model::{ChatRole, ContentOrigin, QuizQuestion};

    use crate::content::{OfflineDataset, RemoteGenerator, StyleHint};
    use crate::error::GeneratorError;

    /// Echoes the input, or reports quota exhaustion while `exhausted` is set.
    #[derive(Default)]
    struct EchoGenerator {
        exhausted: AtomicBool,
    }

    #[async_trait]
    impl RemoteGenerator for EchoGenerator {
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

        async fn chat(
            &self,
            _language: Option<ProgrammingLanguage>,
            _mode: &ChatMode,
            history: &[ChatTurn],
            input: &str,
        ) -> Result<String, GeneratorError> {
            if self.exhausted.load(Ordering::SeqCst) {
                return Err(GeneratorError::QuotaExhausted);
            }
            Ok(format!("#{} {input}", history.len()))
        }
    }

    fn chat(generator: Arc<EchoGenerator>, mode: ChatMode) -> TutorChat {
        let resolver = ContentResolver::new(Arc::new(OfflineDataset::empty()), generator);
        TutorChat::new(Arc::new(resolver), Some(ProgrammingLanguage::Rust), mode)
    }

    #[tokio::test]
    async fn replies_extend_the_transcript() {
        let mut chat = chat(
            Arc::default(),
            ChatMode::Lesson {
                title: "Functions".into(),
            },
        );
        assert!(chat.history().is_empty());

        let reply = chat.send("  what is fn?  ").await.unwrap();
        assert_eq!(reply, ContentArtifact::Remote("#0 what is fn?".into()));
        let reply = chat.send("and return?").await.unwrap();
        assert_eq!(reply.payload().map(String::as_str), Some("#2 and return?"));

        let roles: Vec<_> = chat.history().iter().map(|turn| turn.role).collect();
        assert_eq!(
            roles,
            vec![ChatRole::User, ChatRole::Tutor, ChatRole::User, ChatRole::Tutor]
        );
        assert_eq!(chat.history()[0].content, "what is fn?");
    }

    #[tokio::test]
    async fn interview_opens_with_greeting_and_reset_restores_it() {
        let mut chat = chat(Arc::default(), ChatMode::Interviewer);
        assert_eq!(chat.history().len(), 1);
        assert_eq!(chat.history()[0].role, ChatRole::Tutor);

        let reply = chat.send("ready").await.unwrap();
        assert_eq!(reply.payload().map(String::as_str), Some("#1 ready"));
        assert_eq!(chat.history().len(), 3);

        chat.reset();
        assert_eq!(chat.history().len(), 1);
    }

    #[tokio::test]
    async fn degraded_turn_leaves_transcript_for_retry() {
        let generator = Arc::new(EchoGenerator::default());
        let mut chat = chat(
            Arc::clone(&generator),
            ChatMode::Lesson {
                title: "Loops".into(),
            },
        );

        generator.exhausted.store(true, Ordering::SeqCst);
        let reply = chat.send("why loop?").await.unwrap();
        assert_eq!(reply.origin(), ContentOrigin::Degraded);
        assert!(chat.history().is_empty());

        generator.exhausted.store(false, Ordering::SeqCst);
        chat.send("why loop?").await.unwrap();
        assert_eq!(chat.history().len(), 2);

        assert!(matches!(
            chat.send("   ").await,
            Err(TutorChatError::EmptyMessage)
        ));
    }
}
