use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use services::{AppServices, Clock};
use tracing_subscriber::EnvFilter;
use tutor_core::model::{LoginProvider, ProgrammingLanguage};

mod commands;

#[derive(Parser)]
#[command(name = "codesage")]
#[command(about = "Learn programming languages one lesson and quiz at a time")]
#[command(version)]
struct Cli {
    /// SQLite database holding progress and settings
    #[arg(long, global = true, env = "CODESAGE_DB_URL", default_value = "sqlite://codesage.sqlite3")]
    db: String,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log in, creating progress on first login
    Login {
        username: String,
        #[arg(long, default_value = "local")]
        provider: LoginProvider,
    },

    /// End the current session (progress is kept)
    Logout,

    /// Choose the language track to work on
    Select { language: ProgrammingLanguage },

    /// List the lessons of a track with completion marks
    Lessons { language: Option<ProgrammingLanguage> },

    /// Show a lesson of the active track
    Lesson { lesson: String },

    /// Take the quiz for a lesson of the active track
    Quiz { lesson: String },

    /// Show streak, achievements and per-track progress
    Progress,

    /// Manage saved code snippets
    Snippet {
        #[command(subcommand)]
        action: SnippetAction,
    },

    /// Review cards for later practice
    Flashcard {
        #[command(subcommand)]
        action: FlashcardAction,
    },

    /// Talk to the tutor about a lesson, or sit a mock interview
    Chat {
        /// Lesson of the active track to ask about; without it the tutor runs
        /// a mock interview
        #[arg(long)]
        lesson: Option<String>,
    },

    /// Show or change settings
    Settings {
        /// Explain-like-I'm-5 lesson style
        #[arg(long)]
        eli5: Option<bool>,
        #[arg(long)]
        api_key: Option<String>,
        #[arg(long)]
        api_model: Option<String>,
        #[arg(long)]
        api_base_url: Option<String>,
    },

    /// Erase all progress of the logged-in learner
    Reset {
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum SnippetAction {
    /// Save code from a file (or stdin with `-`)
    Add {
        title: String,
        file: PathBuf,
        #[arg(long)]
        language: Option<ProgrammingLanguage>,
    },
    /// List snippets, newest first
    List,
    /// Delete a snippet by id
    Delete { id: String },
}

#[derive(Subcommand)]
enum FlashcardAction {
    /// Add a card
    Add { question: String, answer: String },
    /// Generate a deck from the lessons completed in the active track
    Generate,
    /// List cards
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)),
        )
        .init();

    let db_url = normalize_sqlite_url(&cli.db);
    prepare_sqlite_file(&db_url)?;
    let app = AppServices::new_sqlite(&db_url, Clock::default())
        .await
        .with_context(|| format!("opening {db_url}"))?;

    match cli.command {
        Command::Login { username, provider } => commands::login(&app, provider, &username).await,
        Command::Logout => commands::logout(&app).await,
        Command::Select { language } => commands::select(&app, language).await,
        Command::Lessons { language } => commands::lessons(&app, language).await,
        Command::Lesson { lesson } => commands::lesson(&app, &lesson).await,
        Command::Quiz { lesson } => commands::quiz(&app, &lesson).await,
        Command::Progress => commands::progress(&app).await,
        Command::Snippet { action } => match action {
            SnippetAction::Add {
                title,
                file,
                language,
            } => commands::snippet_add(&app, &title, &file, language).await,
            SnippetAction::List => commands::snippet_list(&app).await,
            SnippetAction::Delete { id } => commands::snippet_delete(&app, &id).await,
        },
        Command::Flashcard { action } => match action {
            FlashcardAction::Add { question, answer } => {
                commands::flashcard_add(&app, &question, &answer).await
            }
            FlashcardAction::Generate => commands::flashcard_generate(&app).await,
            FlashcardAction::List => commands::flashcard_list(&app).await,
        },
        Command::Chat { lesson } => commands::chat(&app, lesson.as_deref()).await,
        Command::Settings {
            eli5,
            api_key,
            api_model,
            api_base_url,
        } => {
            commands::settings(
                &app,
                commands::SettingsChange {
                    eli5,
                    api_key,
                    api_model,
                    api_base_url,
                },
            )
            .await
        }
        Command::Reset { yes } => commands::reset(&app, yes).await,
    }
}

fn normalize_sqlite_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed == "sqlite::memory:" || trimmed.starts_with("sqlite://") {
        return trimmed.to_string();
    }

    let path_str = trimmed.strip_prefix("sqlite:").unwrap_or(trimmed);
    let path = Path::new(path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

/// `SQLite` refuses to open a missing file without `mode=rwc`; create it and
/// its parent directory up front.
fn prepare_sqlite_file(db_url: &str) -> Result<()> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let Some(path) = db_url.strip_prefix("sqlite://") else {
        bail!("invalid --db value: {db_url}");
    };
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        bail!("invalid --db value: {db_url}");
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)
            .with_context(|| format!("creating {}", path.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlite_urls_are_made_absolute() {
        assert_eq!(normalize_sqlite_url("sqlite::memory:"), "sqlite::memory:");
        assert_eq!(
            normalize_sqlite_url("sqlite:///tmp/codesage.db"),
            "sqlite:///tmp/codesage.db"
        );
        assert_eq!(normalize_sqlite_url("/tmp/a.db"), "sqlite:///tmp/a.db");
        assert!(normalize_sqlite_url("sqlite:rel.db").ends_with("/rel.db"));
    }

    #[test]
    fn cli_parses_nested_commands() {
        let cli = Cli::try_parse_from([
            "codesage",
            "--db",
            "sqlite::memory:",
            "snippet",
            "add",
            "hello",
            "-",
            "--language",
            "rust",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Command::Snippet {
                action: SnippetAction::Add {
                    language: Some(ProgrammingLanguage::Rust),
                    ..
                }
            }
        ));

        let cli = Cli::try_parse_from(["codesage", "chat", "--lesson", "loops"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Chat { lesson: Some(ref lesson) } if lesson == "loops"
        ));
        let cli = Cli::try_parse_from(["codesage", "flashcard", "generate"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Flashcard {
                action: FlashcardAction::Generate
            }
        ));

        let cli = Cli::try_parse_from(["codesage", "login", "Ada", "--provider", "github"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Login {
                provider: LoginProvider::Github,
                ..
            }
        ));
    }
}
