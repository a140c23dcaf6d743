//! SQLite-backed [`LessonStore`] implementation.
//!
//! Records are stored as JSON bodies next to a `version` column. The
//! compare-and-swap write is a single conditional statement: an
//! `INSERT .. ON CONFLICT DO NOTHING` when the record is expected to be
//! absent, or an `UPDATE .. WHERE version = ?` otherwise. Zero affected
//! rows means another writer got there first.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use lesson_sync_core::models::{DictationExercise, LessonKey, LessonRecord};
use lesson_sync_core::store::{LessonStore, Versioned, WriteConflict};

pub struct SqliteLessonStore {
    pool: SqlitePool,
}

impl SqliteLessonStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn current_version(&self, key: &LessonKey) -> Result<Option<u64>> {
        let version: Option<i64> =
            sqlx::query_scalar("SELECT version FROM lesson_records WHERE record_key = ?")
                .bind(key.to_string())
                .fetch_optional(&self.pool)
                .await?;
        Ok(version.map(|v| v as u64))
    }
}

fn parse_record(key: &str, body: &str) -> Result<LessonRecord> {
    serde_json::from_str(body).with_context(|| format!("corrupt lesson record body for {}", key))
}

#[async_trait]
impl LessonStore for SqliteLessonStore {
    async fn load_record(&self, key: &LessonKey) -> Result<Option<Versioned<LessonRecord>>> {
        let row = sqlx::query("SELECT version, body_json FROM lesson_records WHERE record_key = ?")
            .bind(key.to_string())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let version: i64 = row.get("version");
                let body: String = row.get("body_json");
                Ok(Some(Versioned {
                    version: version as u64,
                    value: parse_record(&key.to_string(), &body)?,
                }))
            }
            None => Ok(None),
        }
    }

    async fn save_record(
        &self,
        key: &LessonKey,
        record: &LessonRecord,
        expected: Option<u64>,
    ) -> Result<u64> {
        let record_key = key.to_string();
        let body = serde_json::to_string(record)?;
        let updated_at = record
            .updated_at
            .unwrap_or_else(chrono::Utc::now)
            .timestamp();

        let (result, version) = match expected {
            None => {
                let result = sqlx::query(
                    r#"
                    INSERT INTO lesson_records (record_key, level, lesson, pattern, version, body_json, updated_at)
                    VALUES (?, ?, ?, ?, 1, ?, ?)
                    ON CONFLICT(record_key) DO NOTHING
                    "#,
                )
                .bind(&record_key)
                .bind(&key.level)
                .bind(&key.lesson)
                .bind(&key.pattern)
                .bind(&body)
                .bind(updated_at)
                .execute(&self.pool)
                .await?;
                (result, 1)
            }
            Some(expected) => {
                let next = expected + 1;
                let result = sqlx::query(
                    r#"
                    UPDATE lesson_records
                    SET version = ?, body_json = ?, updated_at = ?
                    WHERE record_key = ? AND version = ?
                    "#,
                )
                .bind(next as i64)
                .bind(&body)
                .bind(updated_at)
                .bind(&record_key)
                .bind(expected as i64)
                .execute(&self.pool)
                .await?;
                (result, next)
            }
        };

        if result.rows_affected() == 0 {
            let found = self.current_version(key).await?;
            return Err(WriteConflict {
                key: record_key,
                expected,
                found,
            }
            .into());
        }
        Ok(version)
    }

    async fn list_records(&self) -> Result<Vec<(LessonKey, Versioned<LessonRecord>)>> {
        let rows = sqlx::query(
            r#"
            SELECT record_key, level, lesson, pattern, version, body_json
            FROM lesson_records
            ORDER BY level, lesson, pattern
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let record_key: String = row.get("record_key");
                let key = LessonKey::new(
                    row.get::<String, _>("level"),
                    row.get::<String, _>("lesson"),
                    row.get::<String, _>("pattern"),
                );
                let version: i64 = row.get("version");
                let body: String = row.get("body_json");
                Ok((
                    key,
                    Versioned {
                        version: version as u64,
                        value: parse_record(&record_key, &body)?,
                    },
                ))
            })
            .collect()
    }

    async fn put_exercise(&self, key: &LessonKey, exercise: &DictationExercise) -> Result<()> {
        let body = serde_json::to_string(exercise)?;
        sqlx::query(
            r#"
            INSERT INTO dictation_exercises (record_key, body_json, created_at)
            VALUES (?, ?, ?)
            ON CONFLICT(record_key) DO UPDATE SET
                body_json = excluded.body_json,
                created_at = excluded.created_at
            "#,
        )
        .bind(key.to_string())
        .bind(&body)
        .bind(exercise.created_at.timestamp())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_exercise(&self, key: &LessonKey) -> Result<Option<DictationExercise>> {
        let body: Option<String> =
            sqlx::query_scalar("SELECT body_json FROM dictation_exercises WHERE record_key = ?")
                .bind(key.to_string())
                .fetch_optional(&self.pool)
                .await?;

        body.map(|b| {
            serde_json::from_str(&b)
                .with_context(|| format!("corrupt dictation exercise body for {}", key))
        })
        .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lesson_sync_core::store::is_write_conflict;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn memory_store() -> SqliteLessonStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::migrate::apply(&pool).await.unwrap();
        SqliteLessonStore::new(pool)
    }

    #[tokio::test]
    async fn test_compare_and_swap() {
        let store = memory_store().await;
        let key = LessonKey::new("Level1", "Lesson3", "C");
        let mut record = LessonRecord::empty();
        record.title = "first".into();

        assert_eq!(store.save_record(&key, &record, None).await.unwrap(), 1);
        let err = store.save_record(&key, &record, None).await.unwrap_err();
        assert!(is_write_conflict(&err));

        record.title = "second".into();
        assert_eq!(store.save_record(&key, &record, Some(1)).await.unwrap(), 2);
        let err = store.save_record(&key, &record, Some(1)).await.unwrap_err();
        let conflict = err.downcast_ref::<WriteConflict>().unwrap();
        assert_eq!(conflict.found, Some(2));

        let loaded = store.load_record(&key).await.unwrap().unwrap();
        assert_eq!(loaded.version, 2);
        assert_eq!(loaded.value.title, "second");

        let listed = store.list_records().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].0, key);
    }

    #[tokio::test]
    async fn test_update_of_missing_record_conflicts() {
        let store = memory_store().await;
        let key = LessonKey::new("Level1", "Lesson3", "C");
        let err = store
            .save_record(&key, &LessonRecord::empty(), Some(4))
            .await
            .unwrap_err();
        let conflict = err.downcast_ref::<WriteConflict>().unwrap();
        assert_eq!(conflict.found, None);
    }
}
