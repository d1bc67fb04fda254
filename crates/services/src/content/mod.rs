//! Lesson and quiz content: bundled data, the remote generator, and the
//! resolver that chooses between them.

pub mod chat;
pub mod generator;
pub mod offline;
pub mod requests;
pub mod resolver;

pub use chat::{ChatGenerator, GeneratorConfig};
pub use generator::{RemoteGenerator, StyleHint, parse_flashcards, parse_quiz};
pub use offline::{OfflineDataset, OfflineEntry};
pub use requests::{CancelHandle, CancelSignal, RequestTicket, RequestTracker};
pub use resolver::{ContentResolver, Resolution};
