use std::sync::Arc;

use storage::repository::{Storage, StorageError};
use tutor_core::model::{ChatMode, LoginProvider, ProgrammingLanguage};

use crate::content::{
    ChatGenerator, ContentResolver, GeneratorConfig, OfflineDataset, RemoteGenerator, StyleHint,
};
use crate::error::AppServicesError;
use crate::flashcard_flow::FlashcardFlow;
use crate::progress_store::{ProgressStore, ProgressUpdate};
use crate::quiz_flow::QuizFlow;
use crate::session_binding::SessionBinding;
use crate::settings_service::SettingsService;
use crate::tutor_chat::TutorChat;
use crate::Clock;

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    clock: Clock,
    storage: Storage,
    settings: Arc<SettingsService>,
    resolver: Arc<ContentResolver>,
    quiz_flow: QuizFlow,
    flashcard_flow: FlashcardFlow,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization or loading settings fails.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Self::from_storage(storage, clock).await
    }

    /// Build services over an existing backend, configuring the remote
    /// generator from the environment and persisted settings.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if settings cannot be loaded.
    pub async fn from_storage(storage: Storage, clock: Clock) -> Result<Self, AppServicesError> {
        let settings = Arc::new(SettingsService::new(Arc::clone(&storage.settings)));
        let current = settings.load().await?;
        let config = GeneratorConfig::resolve(&current);
        if config.is_none() {
            tracing::info!("no API key configured, only bundled content is available");
        }
        let generator: Arc<dyn RemoteGenerator> = Arc::new(ChatGenerator::new(config));
        let resolver = ContentResolver::new(Arc::new(OfflineDataset::bundled()), generator)
            .with_style(StyleHint::from_settings(&current));
        Ok(Self::assemble(clock, storage, settings, resolver))
    }

    /// Build services around a caller-supplied generator.
    #[must_use]
    pub fn with_generator(
        storage: Storage,
        clock: Clock,
        offline: OfflineDataset,
        generator: Arc<dyn RemoteGenerator>,
    ) -> Self {
        let settings = Arc::new(SettingsService::new(Arc::clone(&storage.settings)));
        let resolver = ContentResolver::new(Arc::new(offline), generator);
        Self::assemble(clock, storage, settings, resolver)
    }

    fn assemble(
        clock: Clock,
        storage: Storage,
        settings: Arc<SettingsService>,
        resolver: ContentResolver,
    ) -> Self {
        let resolver = Arc::new(resolver);
        let quiz_flow = QuizFlow::new(Arc::clone(&resolver));
        let flashcard_flow = FlashcardFlow::new(Arc::clone(&resolver));
        Self {
            clock,
            storage,
            settings,
            resolver,
            quiz_flow,
            flashcard_flow,
        }
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    /// A fresh binding over this backend's progress and session tables.
    #[must_use]
    pub fn session_binding(&self) -> SessionBinding {
        SessionBinding::new(
            Arc::clone(&self.storage.progress),
            Arc::clone(&self.storage.sessions),
        )
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the login cannot be recorded.
    pub async fn login(
        &self,
        provider: LoginProvider,
        username: &str,
    ) -> Result<(ProgressStore, ProgressUpdate), StorageError> {
        ProgressStore::login(self.clock, self.session_binding(), provider, username).await
    }

    /// Store for the learner left logged in by a previous run, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the session or progress cannot be read.
    pub async fn resume(&self) -> Result<Option<ProgressStore>, StorageError> {
        ProgressStore::resume(self.clock, self.session_binding()).await
    }

    #[must_use]
    pub fn settings(&self) -> Arc<SettingsService> {
        Arc::clone(&self.settings)
    }

    #[must_use]
    pub fn resolver(&self) -> Arc<ContentResolver> {
        Arc::clone(&self.resolver)
    }

    #[must_use]
    pub fn quiz_flow(&self) -> QuizFlow {
        self.quiz_flow.clone()
    }

    #[must_use]
    pub fn flashcard_flow(&self) -> FlashcardFlow {
        self.flashcard_flow.clone()
    }

    /// A new conversation over this app's generator.
    #[must_use]
    pub fn tutor_chat(&self, language: Option<ProgrammingLanguage>, mode: ChatMode) -> TutorChat {
        TutorChat::new(Arc::clone(&self.resolver), language, mode)
    }
}
