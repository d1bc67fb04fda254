use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use services::{
    AppServices, ContentResolver, GeneratorError, OfflineDataset, PersistOutcome, ProgressStore,
    QuizFlow, RemoteGenerator, SessionBinding, StyleHint,
};
use storage::repository::{
    ActiveSessionRepository, InMemoryRepository, ProgressRepository, Storage, StorageError,
};
use tutor_core::model::{
    AchievementId, ChatMode, ChatTurn, ContentOrigin, FlashcardDraft, LearnerId, LessonId,
    LoginProvider, ProgrammingLanguage, QuizQuestion, UserProgress, lessons,
};
use tutor_core::quiz::{Advance, QuizCompletion, QuizSession, quiz_score};
use tutor_core::time::fixed_clock;

/// Remote generator that always answers with a two-question quiz.
#[derive(Default)]
struct CountingGenerator {
    calls: AtomicUsize,
}

#[async_trait]
impl RemoteGenerator for CountingGenerator {
    async fn generate_lesson(
        &self,
        language: ProgrammingLanguage,
        topic: &str,
        _style: StyleHint,
    ) -> Result<String, GeneratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("# {topic} ({language})"))
    }

    async fn generate_quiz(
        &self,
        _language: ProgrammingLanguage,
        topic: &str,
    ) -> Result<Vec<QuizQuestion>, GeneratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let question = |n: usize| {
            QuizQuestion::new(
                format!("{topic} question {n}"),
                vec!["right".into(), "wrong".into()],
                0,
                "",
            )
        };
        Ok(vec![question(1).unwrap(), question(2).unwrap()])
    }

    async fn chat(
        &self,
        _language: Option<ProgrammingLanguage>,
        mode: &ChatMode,
        history: &[ChatTurn],
        input: &str,
    ) -> Result<String, GeneratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("[{mode}, {} earlier] {input}", history.len()))
    }

    async fn generate_flashcards(
        &self,
        language: ProgrammingLanguage,
        topics: &[String],
    ) -> Result<Vec<FlashcardDraft>, GeneratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        topics
            .iter()
            .map(|topic| FlashcardDraft::new(format!("{topic} in {language}?"), "Answer"))
            .collect::<Result<_, _>>()
            .map_err(|err| GeneratorError::Malformed(err.to_string()))
    }
}

fn completion(language: ProgrammingLanguage, lesson: &str) -> QuizCompletion {
    QuizCompletion {
        language,
        lesson: LessonId::new(lesson),
        correct: 1,
        total: 2,
        score: quiz_score(1, 2),
    }
}

#[tokio::test]
async fn login_quiz_and_resume() {
    let storage = Storage::in_memory();
    let generator = Arc::new(CountingGenerator::default());
    let app = AppServices::with_generator(
        storage.clone(),
        fixed_clock(),
        OfflineDataset::bundled(),
        generator.clone(),
    );

    let (mut store, login) = app.login(LoginProvider::Google, "Ada").await.unwrap();
    assert_eq!(login.current.streak().current(), 1);
    store.select_language(ProgrammingLanguage::Python).await;

    // Bundled quiz, answered with one mistake.
    let mut session = QuizSession::new(ProgrammingLanguage::Python, LessonId::new("intro"));
    let origin = app.quiz_flow().request(&mut session).await.unwrap();
    assert_eq!(origin, ContentOrigin::Offline);

    let mut first = true;
    let finished = loop {
        let question = session.current_question().unwrap();
        let choice = if first {
            (question.correct_index() + 1) % question.options().len()
        } else {
            question.correct_index()
        };
        first = false;
        session.answer(choice).unwrap();
        if let Advance::Finished(completion) = session.advance().unwrap() {
            break completion;
        }
    };
    assert_eq!(finished.score.value(), 67);

    let update = QuizFlow::record(&mut store, &finished).await.unwrap();
    assert_eq!(update.persisted, PersistOutcome::Saved);
    assert_eq!(
        update.newly_unlocked.iter().collect::<Vec<_>>(),
        vec![&AchievementId::new("first_step")]
    );
    assert_eq!(generator.calls.load(Ordering::SeqCst), 0);

    // A lesson outside the bundle goes to the generator once.
    let lesson = app
        .resolver()
        .resolve_lesson(ProgrammingLanguage::Python, &LessonId::new("loops"))
        .await;
    assert_eq!(lesson.origin(), ContentOrigin::Remote);
    assert_eq!(generator.calls.load(Ordering::SeqCst), 1);

    drop(store);
    let resumed = app.resume().await.unwrap().expect("active session");
    assert_eq!(resumed.learner().as_str(), "google_ada");
    let summary = resumed
        .snapshot()
        .language_summary(ProgrammingLanguage::Python);
    assert_eq!(summary.completed, 1);
    assert_eq!(summary.next_lesson.map(|lesson| lesson.id), Some("setup"));

    let binding = resumed.logout().await.unwrap();
    assert!(binding.active_learner().await.unwrap().is_none());
    assert!(app.resume().await.unwrap().is_none());
}

#[tokio::test]
async fn dedicated_needs_ten_lessons_across_tracks() {
    let app = AppServices::with_generator(
        Storage::in_memory(),
        fixed_clock(),
        OfflineDataset::empty(),
        Arc::new(CountingGenerator::default()),
    );
    let (mut store, _) = app.login(LoginProvider::Local, "grace").await.unwrap();

    store.select_language(ProgrammingLanguage::Go).await;
    for lesson in lessons(ProgrammingLanguage::Go).iter().take(5) {
        store
            .complete_quiz(&completion(ProgrammingLanguage::Go, lesson.id))
            .await
            .unwrap();
    }
    store.select_language(ProgrammingLanguage::Rust).await;
    for lesson in lessons(ProgrammingLanguage::Rust).iter().take(4) {
        store
            .complete_quiz(&completion(ProgrammingLanguage::Rust, lesson.id))
            .await
            .unwrap();
    }
    assert_eq!(store.snapshot().total_completed_lessons(), 9);
    assert!(!store.snapshot().has_achievement("dedicated"));

    // Repeating a lesson does not count twice.
    let repeat = store
        .complete_quiz(&completion(ProgrammingLanguage::Rust, "intro"))
        .await
        .unwrap();
    assert!(repeat.newly_unlocked.is_empty());

    let tenth = store
        .complete_quiz(&completion(ProgrammingLanguage::Rust, "conditionals"))
        .await
        .unwrap();
    assert!(tenth.newly_unlocked.contains(&AchievementId::new("dedicated")));
}

#[tokio::test]
async fn track_mastery_unlocks_per_language_badge() {
    let app = AppServices::with_generator(
        Storage::in_memory(),
        fixed_clock(),
        OfflineDataset::empty(),
        Arc::new(CountingGenerator::default()),
    );
    let (mut store, _) = app.login(LoginProvider::Local, "linus").await.unwrap();
    store.select_language(ProgrammingLanguage::Cpp).await;

    let catalog = lessons(ProgrammingLanguage::Cpp);
    let mut last = None;
    for lesson in catalog {
        last = Some(
            store
                .complete_quiz(&completion(ProgrammingLanguage::Cpp, lesson.id))
                .await
                .unwrap(),
        );
    }
    let last = last.unwrap();
    assert!(last.newly_unlocked.contains(&AchievementId::new("master_cpp")));
    assert_eq!(
        last.current
            .language_summary(ProgrammingLanguage::Cpp)
            .percent_complete,
        100
    );
    assert!(
        last.current
            .language_summary(ProgrammingLanguage::Cpp)
            .next_lesson
            .is_none()
    );
}

/// Progress repository whose writes always fail.
struct BrokenProgress;

#[async_trait]
impl ProgressRepository for BrokenProgress {
    async fn load_progress(
        &self,
        _learner: &LearnerId,
    ) -> Result<Option<UserProgress>, StorageError> {
        Ok(None)
    }

    async fn save_progress(
        &self,
        _learner: &LearnerId,
        _progress: &UserProgress,
    ) -> Result<(), StorageError> {
        Err(StorageError::Connection("database is locked".into()))
    }
}

#[tokio::test]
async fn persistence_failure_keeps_in_memory_progress() {
    let sessions: Arc<dyn ActiveSessionRepository> = Arc::new(InMemoryRepository::new());
    let binding = SessionBinding::new(Arc::new(BrokenProgress), sessions);
    let mut store = ProgressStore::open(fixed_clock(), binding, LearnerId::new("local_ada"))
        .await
        .unwrap();

    let update = store.select_language(ProgrammingLanguage::Php).await;
    assert!(update.persisted.is_failed());
    assert_eq!(
        store.snapshot().selected_language(),
        Some(ProgrammingLanguage::Php)
    );

    let update = store
        .complete_quiz(&completion(ProgrammingLanguage::Php, "intro"))
        .await
        .unwrap();
    assert!(update.persisted.is_failed());
    assert_eq!(store.snapshot().total_completed_lessons(), 1);
}

#[tokio::test]
async fn sqlite_backed_services_survive_restart() {
    let url = "sqlite:file:memdb_services_restart?mode=memory&cache=shared";
    let storage = Storage::sqlite(url).await.unwrap();
    let app = AppServices::with_generator(
        storage,
        fixed_clock(),
        OfflineDataset::bundled(),
        Arc::new(CountingGenerator::default()),
    );
    let (mut store, _) = app.login(LoginProvider::Github, "Octo Cat").await.unwrap();
    store.select_language(ProgrammingLanguage::Sql).await;
    store
        .save_snippet("top students", "SELECT * FROM s;", ProgrammingLanguage::Sql)
        .await
        .unwrap();

    let reopened = AppServices::new_sqlite(url, fixed_clock()).await.unwrap();
    let resumed = reopened.resume().await.unwrap().expect("still logged in");
    assert_eq!(resumed.learner().as_str(), "github_octo_cat");
    assert_eq!(resumed.snapshot().saved_snippets().len(), 1);

    // Bundled content needs no generator even when none is configured.
    let resolver = ContentResolver::new(
        Arc::new(OfflineDataset::bundled()),
        Arc::new(CountingGenerator::default()),
    );
    let quiz = resolver
        .resolve_quiz(ProgrammingLanguage::Sql, &LessonId::new("intro"))
        .await;
    assert_eq!(quiz.origin(), ContentOrigin::Offline);
}

#[tokio::test]
async fn interview_chat_and_generated_deck() {
    let generator = Arc::new(CountingGenerator::default());
    let app = AppServices::with_generator(
        Storage::in_memory(),
        fixed_clock(),
        OfflineDataset::bundled(),
        generator.clone(),
    );
    let (mut store, _) = app.login(LoginProvider::Local, "barbara").await.unwrap();
    store.select_language(ProgrammingLanguage::Java).await;
    for id in ["intro", "setup"] {
        store
            .complete_quiz(&completion(ProgrammingLanguage::Java, id))
            .await
            .unwrap();
    }

    let mut interview = app.tutor_chat(Some(ProgrammingLanguage::Java), ChatMode::Interviewer);
    let reply = interview.send("Ready").await.unwrap();
    assert_eq!(
        reply.payload().map(String::as_str),
        Some("[mock interview, 1 earlier] Ready")
    );
    assert_eq!(interview.history().len(), 3);

    let (count, update) = app.flashcard_flow().generate(&mut store).await.unwrap();
    assert_eq!(count, 2);
    assert_eq!(update.persisted, PersistOutcome::Saved);
    assert_eq!(
        update.current.flashcards()[0].question,
        "Introduction in Java?"
    );
    assert_eq!(generator.calls.load(Ordering::SeqCst), 2);

    drop(store);
    let resumed = app.resume().await.unwrap().expect("active session");
    assert_eq!(resumed.snapshot().flashcards().len(), 2);
}
