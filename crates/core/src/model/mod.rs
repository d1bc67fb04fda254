mod chat;
mod content;
mod ids;
mod language;
mod lesson;
mod progress;
mod question;
mod settings;

pub use chat::{ChatMode, ChatRole, ChatTurn};
pub use content::{ContentArtifact, ContentKey, ContentOrigin, LessonArtifact, QuizArtifact};
pub use ids::{
    AchievementId, FlashcardId, LearnerId, LessonId, LoginProvider, ParseIdError, SnippetId,
};
pub use language::{ProgrammingLanguage, UnknownLanguage};
pub use lesson::{Lesson, lessons};
pub use progress::{
    Flashcard, FlashcardDraft, LanguageProgress, ProgressError, QuizScore, SavedSnippet, Streak,
    TrackSummary, UserProgress,
};
pub use question::{QuestionError, QuizQuestion};
pub use settings::{SettingsError, TutorSettings, TutorSettingsDraft};
