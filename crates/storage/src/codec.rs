//! Serialized form of `UserProgress` shared by every backend.

use serde::{Deserialize, Serialize};
use tutor_core::model::UserProgress;

use crate::repository::StorageError;

pub const PROGRESS_FORMAT_VERSION: u32 = 1;

#[derive(Serialize)]
struct ProgressEnvelopeRef<'a> {
    version: u32,
    progress: &'a UserProgress,
}

#[derive(Deserialize)]
struct ProgressEnvelope {
    version: u32,
    progress: UserProgress,
}

/// Encode progress as versioned JSON.
///
/// # Errors
///
/// Returns `StorageError::Serialization` if encoding fails.
pub fn encode_progress(progress: &UserProgress) -> Result<String, StorageError> {
    serde_json::to_string(&ProgressEnvelopeRef {
        version: PROGRESS_FORMAT_VERSION,
        progress,
    })
    .map_err(|err| StorageError::Serialization(err.to_string()))
}

/// Decode progress written by `encode_progress`.
///
/// # Errors
///
/// Returns `StorageError::Serialization` for malformed JSON or a format
/// version newer than this build understands.
pub fn decode_progress(raw: &str) -> Result<UserProgress, StorageError> {
    let envelope: ProgressEnvelope =
        serde_json::from_str(raw).map_err(|err| StorageError::Serialization(err.to_string()))?;
    if envelope.version > PROGRESS_FORMAT_VERSION {
        return Err(StorageError::Serialization(format!(
            "unsupported progress format version {}",
            envelope.version
        )));
    }
    Ok(envelope.progress)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tutor_core::model::{LessonId, ProgrammingLanguage, QuizScore};

    #[test]
    fn encodes_with_version_envelope() {
        let progress = UserProgress::default()
            .select_language(ProgrammingLanguage::Rust)
            .record_quiz_result(
                ProgrammingLanguage::Rust,
                &LessonId::new("intro"),
                QuizScore::new(75).unwrap(),
            )
            .unwrap();

        let raw = encode_progress(&progress).unwrap();
        assert!(raw.starts_with("{\"version\":1,"));
        assert_eq!(decode_progress(&raw).unwrap(), progress);
    }

    #[test]
    fn rejects_future_versions_and_garbage() {
        let raw = r#"{"version":99,"progress":{}}"#;
        assert!(matches!(
            decode_progress(raw),
            Err(StorageError::Serialization(_))
        ));
        assert!(decode_progress("not json").is_err());
    }
}
