//! Lesson retrieval by key.
//!
//! Used by both the `lsync get` CLI command and the
//! `GET /lessons/{level}/{lesson}/{pattern}` HTTP endpoint.

use anyhow::{bail, Result};
use serde::Serialize;

use lesson_sync_core::models::{DictationExercise, LessonKey, LessonRecord};
use lesson_sync_core::store::LessonStore;

use crate::config::Config;
use crate::context::PipelineContext;

/// A record, its version, and its exercise if one has been synthesized.
#[derive(Debug, Clone, Serialize)]
pub struct LessonView {
    pub key: String,
    pub version: u64,
    pub record: LessonRecord,
    pub exercise: Option<DictationExercise>,
}

/// Core get function returning structured data (used by CLI and server).
pub async fn get_lesson<S>(store: &S, key: &LessonKey) -> Result<Option<LessonView>>
where
    S: LessonStore + ?Sized,
{
    let Some(record) = store.load_record(key).await? else {
        return Ok(None);
    };
    let exercise = store.get_exercise(key).await?;
    Ok(Some(LessonView {
        key: key.to_string(),
        version: record.version,
        record: record.value,
        exercise,
    }))
}

/// CLI entry point: print the lesson as pretty JSON.
pub async fn run_get(config: &Config, key: &str) -> Result<()> {
    let key: LessonKey = key.parse()?;
    let ctx = PipelineContext::from_config(config).await?;

    match get_lesson(ctx.store.as_ref(), &key).await? {
        Some(view) => {
            println!("{}", serde_json::to_string_pretty(&view)?);
            Ok(())
        }
        None => bail!("lesson not found: {}", key),
    }
}
