use std::io::Write as _;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use services::{
    AppServices, CancelSignal, FlashcardFlowError, GeneratorConfig, PersistOutcome, ProgressStore,
    ProgressUpdate, QuizFlow, QuizFlowError, Resolution,
};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader, Lines, Stdin};
use tokio::task::JoinHandle;
use tutor_core::achievements::Achievement;
use tutor_core::model::{
    ChatMode, ContentArtifact, Lesson, LessonId, LoginProvider, ProgrammingLanguage, SnippetId,
    TrackSummary, UserProgress, lessons as catalog,
};
use tutor_core::quiz::{Advance, QuizSession};

pub struct SettingsChange {
    pub eli5: Option<bool>,
    pub api_key: Option<String>,
    pub api_model: Option<String>,
    pub api_base_url: Option<String>,
}

impl SettingsChange {
    fn is_empty(&self) -> bool {
        self.eli5.is_none()
            && self.api_key.is_none()
            && self.api_model.is_none()
            && self.api_base_url.is_none()
    }
}

pub async fn login(app: &AppServices, provider: LoginProvider, username: &str) -> Result<()> {
    let (store, update) = app.login(provider, username).await?;
    println!(
        "Logged in as {}. Streak: {} day(s).",
        store.learner(),
        update.current.streak().current()
    );
    report(&update);
    Ok(())
}

pub async fn logout(app: &AppServices) -> Result<()> {
    match app.resume().await? {
        Some(store) => {
            let learner = store.learner().clone();
            store.logout().await?;
            println!("Logged out {learner}. Progress is kept for next time.");
        }
        None => println!("Nobody is logged in."),
    }
    Ok(())
}

pub async fn select(app: &AppServices, language: ProgrammingLanguage) -> Result<()> {
    let mut store = active_store(app).await?;
    let update = store.select_language(language).await;
    println!("Now learning {language}.");
    report(&update);
    Ok(())
}

pub async fn lessons(app: &AppServices, language: Option<ProgrammingLanguage>) -> Result<()> {
    let store = active_store(app).await?;
    let progress = store.snapshot();
    let language = track(&progress, language)?;
    let data = progress.language(language);

    println!("{language}: {}", language.description());
    for lesson in catalog(language) {
        let id = lesson.lesson_id();
        let mark = match data.and_then(|data| data.score(&id)) {
            Some(score) => format!("done, {}%", score.value()),
            None => "todo".to_string(),
        };
        println!(
            "  {}. {:<14} {:<26} [{mark}]",
            lesson.order, lesson.id, lesson.title
        );
    }
    let summary = progress.language_summary(language);
    println!(
        "{}/{} complete ({}%). Next up: {}.",
        summary.completed,
        summary.total,
        summary.percent_complete,
        next_up(&summary)
    );
    Ok(())
}

pub async fn lesson(app: &AppServices, lesson: &str) -> Result<()> {
    let store = active_store(app).await?;
    let language = track(&store.snapshot(), None)?;
    let entry = catalog_lesson(language, lesson)?;

    let (signal, watcher) = cancel_on_ctrl_c();
    let resolution = app
        .resolver()
        .load_lesson(language, &entry.lesson_id(), &signal)
        .await;
    watcher.abort();

    match resolution {
        Resolution::Ready(artifact) => {
            tracing::debug!(origin = %artifact.origin(), "lesson resolved");
            match artifact {
                ContentArtifact::Offline(text) | ContentArtifact::Remote(text) => {
                    println!("{text}");
                }
                ContentArtifact::Degraded { notice } => println!("{notice}"),
                ContentArtifact::Failed { message } => bail!(message),
            }
        }
        Resolution::Aborted => println!("Cancelled."),
        Resolution::Busy | Resolution::Superseded => {
            println!("Another request for this lesson is running.");
        }
    }
    Ok(())
}

pub async fn quiz(app: &AppServices, lesson: &str) -> Result<()> {
    let mut store = active_store(app).await?;
    let language = track(&store.snapshot(), None)?;
    let entry = catalog_lesson(language, lesson)?;
    let mut session = QuizSession::new(language, entry.lesson_id());

    let (signal, watcher) = cancel_on_ctrl_c();
    let requested = app
        .quiz_flow()
        .request_cancellable(&mut session, &signal)
        .await;
    watcher.abort();
    match requested {
        Ok(origin) => tracing::debug!(%origin, "quiz ready"),
        Err(QuizFlowError::Unavailable { notice, .. }) => {
            println!("{notice}");
            return Ok(());
        }
        Err(QuizFlowError::Aborted) => {
            println!("Cancelled.");
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    }

    println!("Quiz: {} ({language})\n", entry.title);
    let total = session.question_count();
    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let completion = loop {
        let Some(question) = session.current_question() else {
            bail!("quiz ended unexpectedly");
        };
        let options = question.options().to_vec();
        println!("Question {}/{total}: {}", position(&session), question.prompt());
        for (index, option) in options.iter().enumerate() {
            println!("  {}) {option}", index + 1);
        }

        let choice = read_choice(&mut input, options.len()).await?;
        let feedback = session.answer(choice)?;
        if feedback.is_correct {
            println!("Correct!");
        } else {
            println!("Not quite. The answer was: {}", options[feedback.correct_index]);
        }
        if !feedback.explanation.is_empty() {
            println!("{}", feedback.explanation);
        }
        println!();

        if let Advance::Finished(completion) = session.advance()? {
            break completion;
        }
    };

    println!(
        "You scored {}% ({}/{}).",
        completion.score.value(),
        completion.correct,
        completion.total
    );
    let update = QuizFlow::record(&mut store, &completion).await?;
    report(&update);
    Ok(())
}

pub async fn progress(app: &AppServices) -> Result<()> {
    let store = active_store(app).await?;
    let progress = store.snapshot();

    println!("Learner: {}", store.learner());
    println!("Streak: {} day(s)", progress.streak().current());
    match progress.selected_language() {
        Some(language) => println!("Current track: {language}"),
        None => println!("Current track: none (run `codesage select <language>`)"),
    }
    println!("Lessons completed: {}", progress.total_completed_lessons());

    for language in progress.language_data().keys() {
        let summary = progress.language_summary(*language);
        println!(
            "  {:<12} {}/{} ({}%), next: {}",
            language.display_name(),
            summary.completed,
            summary.total,
            summary.percent_complete,
            next_up(&summary)
        );
    }

    if progress.unlocked_achievements().is_empty() {
        println!("Achievements: none yet");
    } else {
        println!("Achievements:");
        for id in progress.unlocked_achievements() {
            match Achievement::find(id) {
                Some(achievement) => {
                    println!("  {} - {}", achievement.title, achievement.description);
                }
                None => println!("  {id}"),
            }
        }
    }
    println!(
        "Saved snippets: {}, flashcards: {}",
        progress.saved_snippets().len(),
        progress.flashcards().len()
    );
    Ok(())
}

pub async fn snippet_add(
    app: &AppServices,
    title: &str,
    file: &Path,
    language: Option<ProgrammingLanguage>,
) -> Result<()> {
    let mut store = active_store(app).await?;
    let language = track(&store.snapshot(), language)?;
    let code = if file == Path::new("-") {
        let mut code = String::new();
        tokio::io::stdin()
            .read_to_string(&mut code)
            .await
            .context("reading snippet from stdin")?;
        code
    } else {
        std::fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?
    };

    let (id, update) = store.save_snippet(title, &code, language).await?;
    println!("Saved snippet {id}.");
    report(&update);
    Ok(())
}

pub async fn snippet_list(app: &AppServices) -> Result<()> {
    let store = active_store(app).await?;
    let progress = store.snapshot();
    let snippets = progress.snippets_newest_first();
    if snippets.is_empty() {
        println!("No saved snippets.");
    }
    for snippet in snippets {
        println!(
            "{}  {}  {} ({})",
            snippet.id,
            snippet.saved_at.format("%Y-%m-%d"),
            snippet.title,
            snippet.language
        );
    }
    Ok(())
}

pub async fn snippet_delete(app: &AppServices, id: &str) -> Result<()> {
    let mut store = active_store(app).await?;
    let id = SnippetId::from_str(id)?;
    if !store
        .snapshot()
        .saved_snippets()
        .iter()
        .any(|snippet| snippet.id == id)
    {
        bail!("no snippet with id {id}");
    }
    let update = store.delete_snippet(id).await;
    println!("Deleted snippet {id}.");
    report(&update);
    Ok(())
}

pub async fn flashcard_add(app: &AppServices, question: &str, answer: &str) -> Result<()> {
    let mut store = active_store(app).await?;
    let (id, update) = store.add_flashcard(question, answer).await?;
    println!("Added flashcard {id}.");
    report(&update);
    Ok(())
}

pub async fn flashcard_generate(app: &AppServices) -> Result<()> {
    let mut store = active_store(app).await?;
    match app.flashcard_flow().generate(&mut store).await {
        Ok((count, update)) => {
            println!("Added {count} generated flashcard(s).");
            report(&update);
        }
        Err(FlashcardFlowError::Unavailable { notice, .. }) => println!("{notice}"),
        Err(err) => return Err(err.into()),
    }
    Ok(())
}

pub async fn flashcard_list(app: &AppServices) -> Result<()> {
    let store = active_store(app).await?;
    let progress = store.snapshot();
    if progress.flashcards().is_empty() {
        println!("No flashcards.");
    }
    for card in progress.flashcards() {
        println!(
            "{}  due {}\n  Q: {}\n  A: {}",
            card.id,
            card.next_review.format("%Y-%m-%d"),
            card.question,
            card.answer
        );
    }
    Ok(())
}

/// Interactive tutor conversation. `exit` or end of input leaves, `reset`
/// starts over.
pub async fn chat(app: &AppServices, lesson: Option<&str>) -> Result<()> {
    let store = active_store(app).await?;
    let progress = store.snapshot();
    let (language, mode) = match lesson {
        Some(lesson) => {
            let language = track(&progress, None)?;
            let entry = catalog_lesson(language, lesson)?;
            let title = entry.title.to_string();
            (Some(language), ChatMode::Lesson { title })
        }
        None => (progress.selected_language(), ChatMode::Interviewer),
    };

    let mut chat = app.tutor_chat(language, mode);
    println!("{} (type `exit` to leave, `reset` to start over)\n", chat.mode());
    if let Some(greeting) = chat.history().first() {
        println!("CodeSage: {}\n", greeting.content);
    }

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("You: ");
        std::io::stdout().flush()?;
        let Some(line) = input.next_line().await? else {
            break;
        };
        match line.trim() {
            "" => continue,
            "exit" | "quit" => break,
            "reset" => {
                chat.reset();
                println!("Conversation cleared.\n");
                continue;
            }
            _ => {}
        }

        match chat.send(&line).await? {
            ContentArtifact::Offline(reply) | ContentArtifact::Remote(reply) => {
                println!("CodeSage: {reply}\n");
            }
            ContentArtifact::Degraded { notice } => println!("{notice}\n"),
            ContentArtifact::Failed { message } => println!("{message}\n"),
        }
    }
    Ok(())
}

pub async fn settings(app: &AppServices, change: SettingsChange) -> Result<()> {
    let service = app.settings();
    let mut settings = service.load().await?;

    if !change.is_empty() {
        let mut draft = settings.to_draft();
        if let Some(eli5) = change.eli5 {
            draft.eli5_mode = eli5;
        }
        if change.api_key.is_some() {
            draft.api_key = change.api_key;
        }
        if change.api_model.is_some() {
            draft.api_model = change.api_model;
        }
        if change.api_base_url.is_some() {
            draft.api_base_url = change.api_base_url;
        }
        settings = service.save(draft).await?;
        println!("Settings saved.");
    }

    println!("Explain like I'm 5: {}", settings.eli5_mode());
    println!(
        "API key: {}",
        if settings.api_key().is_some() { "set" } else { "not set" }
    );
    println!("Model: {}", settings.api_model().unwrap_or("(default)"));
    println!("Base URL: {}", settings.api_base_url().unwrap_or("(default)"));
    match GeneratorConfig::resolve(&settings) {
        Some(config) => println!("Remote generation: enabled ({})", config.model),
        None => println!("Remote generation: disabled, bundled lessons only"),
    }
    Ok(())
}

pub async fn reset(app: &AppServices, confirmed: bool) -> Result<()> {
    let mut store = active_store(app).await?;
    if !confirmed {
        bail!(
            "this erases all progress for {}; re-run with --yes to confirm",
            store.learner()
        );
    }
    let update = store.reset().await;
    println!("Progress for {} has been reset.", store.learner());
    report(&update);
    Ok(())
}

async fn active_store(app: &AppServices) -> Result<ProgressStore> {
    app.resume()
        .await?
        .context("not logged in; run `codesage login <username>` first")
}

fn track(
    progress: &UserProgress,
    requested: Option<ProgrammingLanguage>,
) -> Result<ProgrammingLanguage> {
    requested
        .or(progress.selected_language())
        .context("no track selected; run `codesage select <language>` first")
}

fn catalog_lesson(language: ProgrammingLanguage, lesson: &str) -> Result<&'static Lesson> {
    Lesson::find(language, &LessonId::new(lesson)).with_context(|| {
        let known: Vec<&str> = catalog(language).iter().map(|lesson| lesson.id).collect();
        format!("unknown lesson {lesson:?}; expected one of {}", known.join(", "))
    })
}

/// Ctrl-C abandons a pending content request instead of killing the process.
fn cancel_on_ctrl_c() -> (CancelSignal, JoinHandle<()>) {
    let (handle, signal) = CancelSignal::pair();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            handle.cancel();
        }
    });
    (signal, watcher)
}

fn next_up(summary: &TrackSummary) -> &'static str {
    summary
        .next_lesson
        .map_or("nothing, the track is complete", |lesson| lesson.title)
}

fn position(session: &QuizSession) -> usize {
    match session.state() {
        tutor_core::quiz::QuizState::InProgress { index, .. } => index + 1,
        _ => 0,
    }
}

async fn read_choice(input: &mut Lines<BufReader<Stdin>>, options: usize) -> Result<usize> {
    loop {
        print!("Your answer [1-{options}]: ");
        std::io::stdout().flush()?;
        let line = input
            .next_line()
            .await?
            .context("input closed before the quiz finished")?;
        match line.trim().parse::<usize>() {
            Ok(choice) if (1..=options).contains(&choice) => return Ok(choice - 1),
            _ => println!("Please enter a number between 1 and {options}."),
        }
    }
}

fn report(update: &ProgressUpdate) {
    for id in &update.newly_unlocked {
        match Achievement::find(id) {
            Some(achievement) => println!(
                "Achievement unlocked: {} - {}",
                achievement.title, achievement.description
            ),
            None => println!("Achievement unlocked: {id}"),
        }
    }
    if let PersistOutcome::Failed(reason) = &update.persisted {
        eprintln!("warning: progress could not be saved ({reason}); it is kept for this run");
    }
}
