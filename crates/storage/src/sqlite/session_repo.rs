use async_trait::async_trait;
use sqlx::Row;
use tutor_core::model::LearnerId;

use super::SqliteRepository;
use super::mapping::{conn, ser};
use crate::repository::{ActiveSessionRepository, StorageError};

#[async_trait]
impl ActiveSessionRepository for SqliteRepository {
    async fn active_learner(&self) -> Result<Option<LearnerId>, StorageError> {
        let row = sqlx::query("SELECT learner_id FROM active_session WHERE id = 1")
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        row.map(|row| row.try_get::<String, _>("learner_id").map(LearnerId::new))
            .transpose()
            .map_err(ser)
    }

    async fn set_active_learner(&self, learner: &LearnerId) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO active_session (id, learner_id)
            VALUES (1, ?1)
            ON CONFLICT(id) DO UPDATE SET learner_id = excluded.learner_id
            ",
        )
        .bind(learner.as_str())
        .execute(&self.pool)
        .await
        .map_err(conn)?;
        Ok(())
    }

    async fn clear_active_learner(&self) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM active_session WHERE id = 1")
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        Ok(())
    }
}
