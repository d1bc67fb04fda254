use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use tutor_core::model::{LearnerId, UserProgress};

use super::SqliteRepository;
use super::mapping::{conn, ser};
use crate::codec::{decode_progress, encode_progress};
use crate::repository::{ProgressRepository, StorageError};

#[async_trait]
impl ProgressRepository for SqliteRepository {
    async fn load_progress(
        &self,
        learner: &LearnerId,
    ) -> Result<Option<UserProgress>, StorageError> {
        let row = sqlx::query("SELECT progress_json FROM learner_progress WHERE learner_id = ?1")
            .bind(learner.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let raw: String = row.try_get("progress_json").map_err(ser)?;
        decode_progress(&raw).map(Some)
    }

    async fn save_progress(
        &self,
        learner: &LearnerId,
        progress: &UserProgress,
    ) -> Result<(), StorageError> {
        let raw = encode_progress(progress)?;

        sqlx::query(
            r"
            INSERT INTO learner_progress (learner_id, progress_json, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(learner_id) DO UPDATE SET
                progress_json = excluded.progress_json,
                updated_at = excluded.updated_at
            ",
        )
        .bind(learner.as_str())
        .bind(raw)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }
}
