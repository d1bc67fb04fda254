use async_trait::async_trait;
use sqlx::Row;
use tutor_core::model::{TutorSettings, TutorSettingsDraft};

use super::SqliteRepository;
use super::mapping::{bool_from_i64, bool_to_i64, conn, ser};
use crate::repository::{SettingsRepository, StorageError};

#[async_trait]
impl SettingsRepository for SqliteRepository {
    async fn get_settings(&self) -> Result<Option<TutorSettings>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT
                eli5_mode,
                api_key,
                api_model,
                api_base_url
            FROM app_settings
            WHERE id = 1
            ",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let eli5_mode = bool_from_i64("eli5_mode", row.try_get("eli5_mode").map_err(ser)?)?;
        let api_key: Option<String> = row.try_get("api_key").map_err(ser)?;
        let api_model: Option<String> = row.try_get("api_model").map_err(ser)?;
        let api_base_url: Option<String> = row.try_get("api_base_url").map_err(ser)?;

        TutorSettings::from_persisted(TutorSettingsDraft {
            eli5_mode,
            api_key,
            api_model,
            api_base_url,
        })
        .map(Some)
        .map_err(ser)
    }

    async fn save_settings(&self, settings: &TutorSettings) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO app_settings (
                id,
                eli5_mode,
                api_key,
                api_model,
                api_base_url
            )
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                eli5_mode = excluded.eli5_mode,
                api_key = excluded.api_key,
                api_model = excluded.api_model,
                api_base_url = excluded.api_base_url
            ",
        )
        .bind(1_i64)
        .bind(bool_to_i64(settings.eli5_mode()))
        .bind(settings.api_key())
        .bind(settings.api_model())
        .bind(settings.api_base_url())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }
}
