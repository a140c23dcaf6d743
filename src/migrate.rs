use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Create tables and indexes. Safe to run repeatedly.
pub async fn apply(pool: &SqlitePool) -> Result<()> {
    // One row per (level, lesson, pattern); `version` drives compare-and-swap
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS lesson_records (
            record_key TEXT PRIMARY KEY,
            level TEXT NOT NULL,
            lesson TEXT NOT NULL,
            pattern TEXT NOT NULL,
            version INTEGER NOT NULL,
            body_json TEXT NOT NULL,
            updated_at INTEGER NOT NULL,
            UNIQUE(level, lesson, pattern)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS dictation_exercises (
            record_key TEXT PRIMARY KEY,
            body_json TEXT NOT NULL,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_lesson_records_updated_at ON lesson_records(updated_at DESC)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
