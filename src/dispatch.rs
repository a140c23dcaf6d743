//! Per-notification routing.
//!
//! ```text
//! path ─ classify ─┬─ Skip ──────────────────────────► report (skipped)
//!                  └─ event ─ apply_event ─┬─────────► report (applied)
//!                                          └─ subtitle ─ synthesize ─► report
//! ```
//!
//! Each notification is handled independently; nothing is shared between
//! calls except the stores in [`PipelineContext`].

use anyhow::Result;
use serde::Serialize;
use tracing::debug;

use lesson_sync_core::classify::{classify_in, ArtifactKind, Classification};

use crate::aggregate::{apply_event, ApplyOutcome};
use crate::config::Config;
use crate::context::PipelineContext;
use crate::synthesize::{synthesize, SynthesisOutcome};

/// What happened to one notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchReport {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passage: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<ApplyOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dictation: Option<SynthesisOutcome>,
}

impl DispatchReport {
    fn skipped(path: &str, reason: &'static str) -> Self {
        Self {
            path: path.to_string(),
            skipped: Some(reason),
            kind: None,
            key: None,
            passage: None,
            record: None,
            dictation: None,
        }
    }
}

/// Handle one object-created notification.
///
/// Subtitle arrivals also rebuild the key's dictation exercise; pass
/// `synthesize_on_subtitle = false` to defer that (backfill does it once per
/// key at the end).
pub async fn dispatch(
    ctx: &PipelineContext,
    path: &str,
    synthesize_on_subtitle: bool,
) -> Result<DispatchReport> {
    let event = match classify_in(&ctx.namespace, path) {
        Classification::Skip(reason) => {
            debug!(path, reason = %reason, "notification skipped");
            return Ok(DispatchReport::skipped(path, reason.as_str()));
        }
        Classification::Artifact(event) => event,
    };

    let record = apply_event(ctx.store.as_ref(), &event, &ctx.retry).await?;

    let dictation = if synthesize_on_subtitle && event.kind == ArtifactKind::PassageSubtitle {
        Some(synthesize(ctx, &event.key).await?)
    } else {
        None
    };

    Ok(DispatchReport {
        path: path.to_string(),
        skipped: None,
        kind: Some(event.kind.as_str()),
        key: Some(event.key.to_string()),
        passage: event.passage,
        record: Some(record),
        dictation,
    })
}

/// CLI entry point: deliver `paths` as notifications, in order.
pub async fn run_apply(config: &Config, paths: &[String]) -> Result<()> {
    let ctx = PipelineContext::from_config(config).await?;

    for path in paths {
        let report = dispatch(&ctx, path, true).await?;
        match (&report.skipped, &report.record) {
            (Some(reason), _) => println!("skip   {} ({})", path, reason),
            (None, Some(record)) => {
                let verb = if record.is_written() { "apply " } else { "same  " };
                println!(
                    "{} {} -> {} v{} [{}]",
                    verb,
                    path,
                    report.key.as_deref().unwrap_or("-"),
                    record.version(),
                    report.kind.unwrap_or("-"),
                );
            }
            (None, None) => {}
        }
        if let Some(dictation) = &report.dictation {
            println!("       dictation: {}", serde_json::to_string(dictation)?);
        }
    }
    println!("ok");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lesson_sync_core::models::LessonKey;
    use lesson_sync_core::objects::memory::InMemoryObjectStore;
    use lesson_sync_core::store::memory::InMemoryLessonStore;
    use std::sync::Arc;

    fn context() -> (PipelineContext, Arc<InMemoryObjectStore>) {
        let objects = Arc::new(InMemoryObjectStore::new());
        let ctx = PipelineContext::new(
            Arc::new(InMemoryLessonStore::new()),
            objects.clone(),
            "official",
        );
        (ctx, objects)
    }

    #[tokio::test]
    async fn test_skip_is_a_no_op() {
        let (ctx, _) = context();
        for path in [
            "drafts/Level1/Lesson1/A/passage1/a_listening.mp3",
            "official/Level1/Lesson1",
            "official/Level1/Lesson1/evaluation/passage1/e_listening.mp3",
            "official/Level1/Lesson1/A/passage1/readme.md",
        ] {
            let report = dispatch(&ctx, path, true).await.unwrap();
            assert!(report.skipped.is_some(), "{}", path);
        }
        assert!(ctx.store.list_records().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_different_passages_share_one_record() {
        let (ctx, _) = context();
        dispatch(&ctx, "official/Level3/Lesson2/B/passage1/b_listening.mp3", true)
            .await
            .unwrap();
        dispatch(&ctx, "official/Level3/Lesson2/B/passage4/b_listening.mp3", true)
            .await
            .unwrap();

        let records = ctx.store.list_records().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].0, LessonKey::new("Level3", "Lesson2", "B"));
        let ids: Vec<u32> = records[0].1.value.passages.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 4]);
    }

    #[tokio::test]
    async fn test_subtitle_triggers_synthesis() {
        let (ctx, objects) = context();
        let path = "official/Level1/Lesson7/C/passage1/c_subtitles.json";
        objects.insert(
            path,
            r#"{"text":"Every winter the lake freezes and families skate across it together."}"#,
        );

        let report = dispatch(&ctx, path, true).await.unwrap();
        assert_eq!(report.kind, Some("passage_subtitle"));
        assert!(report.dictation.as_ref().unwrap().is_written());

        let deferred = dispatch(&ctx, path, false).await.unwrap();
        assert!(deferred.dictation.is_none());
        assert_eq!(deferred.record, Some(ApplyOutcome::Unchanged { version: 2 }));
    }
}
