#![forbid(unsafe_code)]

pub mod app_services;
pub mod content;
pub mod error;
pub mod flashcard_flow;
pub mod progress_store;
pub mod quiz_flow;
pub mod session_binding;
pub mod settings_service;
pub mod tutor_chat;

pub use tutor_core::Clock;

pub use app_services::AppServices;
pub use content::{
    CancelHandle, CancelSignal, ChatGenerator, ContentResolver, GeneratorConfig, OfflineDataset,
    RemoteGenerator, Resolution, StyleHint,
};
pub use error::{
    AppServicesError, FlashcardFlowError, GeneratorError, QuizFlowError, SettingsServiceError,
    TutorChatError,
};
pub use flashcard_flow::FlashcardFlow;
pub use progress_store::{ProgressStore, ProgressUpdate};
pub use quiz_flow::QuizFlow;
pub use session_binding::{PersistOutcome, SessionBinding};
pub use settings_service::SettingsService;
pub use tutor_chat::TutorChat;
