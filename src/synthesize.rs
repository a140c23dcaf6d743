//! Dictation synthesis for one lesson key.
//!
//! Gathers every passage subtitle under the key's prefix, assembles the
//! exercise, and persists it. The output is a pure function of stored
//! subtitles, so concurrent runs for the same key are harmless: the last
//! write wins.

use anyhow::{anyhow, Result};
use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use lesson_sync_core::classify::{classify_in, ArtifactKind};
use lesson_sync_core::cloze::{assemble_exercise, PassageText};
use lesson_sync_core::models::{DictationExercise, LessonKey};

use crate::aggregate::{apply_event, ApplyOutcome};
use crate::config::Config;
use crate::context::PipelineContext;
use crate::transcript::parse_transcript;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SynthesisOutcome {
    Written {
        path: String,
        /// Subtitle files that contributed text.
        sources: usize,
        record: ApplyOutcome,
    },
    /// Not enough text yet; a later subtitle may change that.
    Skipped { reason: SkipCause },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipCause {
    NoSubtitles,
    InsufficientText,
}

impl SkipCause {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipCause::NoSubtitles => "no_subtitles",
            SkipCause::InsufficientText => "insufficient_text",
        }
    }
}

impl SynthesisOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self, SynthesisOutcome::Written { .. })
    }
}

/// Read the key's passage subtitles in path order.
///
/// Fails on the first subtitle that does not parse.
pub async fn collect_transcripts(ctx: &PipelineContext, key: &LessonKey) -> Result<Vec<PassageText>> {
    let prefix = key.prefix(&ctx.namespace);
    let mut texts = Vec::new();

    for path in ctx.objects.list(&prefix).await? {
        let Some(event) = classify_in(&ctx.namespace, &path).into_event() else {
            continue;
        };
        if event.kind != ArtifactKind::PassageSubtitle || &event.key != key {
            continue;
        }
        let Some(bytes) = ctx.objects.read(&path).await? else {
            continue;
        };
        let transcript = parse_transcript(&bytes, &path).map_err(|e| {
            warn!(%key, path = %path, error = %e, "malformed subtitle, synthesis aborted");
            anyhow::Error::new(e)
        })?;
        texts.push(PassageText {
            passage: event.passage,
            text: transcript.plain_text(),
        });
    }

    Ok(texts)
}

/// Rebuild the dictation exercise for `key`, overwriting any previous one.
pub async fn synthesize(ctx: &PipelineContext, key: &LessonKey) -> Result<SynthesisOutcome> {
    let texts = collect_transcripts(ctx, key).await?;
    if texts.is_empty() {
        info!(%key, "no subtitles yet, dictation skipped");
        return Ok(SynthesisOutcome::Skipped {
            reason: SkipCause::NoSubtitles,
        });
    }

    let Some(exercise) = assemble_exercise(key, &ctx.namespace, &texts, &ctx.cloze, Utc::now())
    else {
        info!(%key, sources = texts.len(), "not enough transcript text, dictation skipped");
        return Ok(SynthesisOutcome::Skipped {
            reason: SkipCause::InsufficientText,
        });
    };

    let path = persist_exercise(ctx, key, &exercise).await?;

    // Point the record at the document through the same convergent path a
    // bucket notification for it would take.
    let event = classify_in(&ctx.namespace, &path)
        .into_event()
        .ok_or_else(|| anyhow!("dictation path {} does not classify", path))?;
    let record = apply_event(ctx.store.as_ref(), &event, &ctx.retry).await?;

    info!(%key, path = %path, sources = texts.len(), "dictation written");
    Ok(SynthesisOutcome::Written {
        path,
        sources: texts.len(),
        record,
    })
}

async fn persist_exercise(
    ctx: &PipelineContext,
    key: &LessonKey,
    exercise: &DictationExercise,
) -> Result<String> {
    ctx.store.put_exercise(key, exercise).await?;

    let path = key.dictation_path(&ctx.namespace);
    let body = serde_json::to_vec_pretty(exercise)?;
    ctx.objects.write(&path, &body).await?;
    Ok(path)
}

/// CLI entry point: rebuild one key's dictation now.
pub async fn run_synthesize(config: &Config, key: &str) -> Result<()> {
    let key: LessonKey = key.parse()?;
    let ctx = PipelineContext::from_config(config).await?;

    match synthesize(&ctx, &key).await? {
        SynthesisOutcome::Written { path, sources, .. } => {
            println!("synthesize {}", key);
            println!("  subtitles used: {}", sources);
            println!("  written: {}", path);
        }
        SynthesisOutcome::Skipped { reason } => {
            println!("synthesize {}", key);
            println!("  skipped: {}", reason.as_str());
        }
    }
    println!("ok");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::MalformedTranscript;
    use lesson_sync_core::models::Mode;
    use lesson_sync_core::objects::ObjectStore;
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

    fn subtitle(text: &str) -> String {
        serde_json::json!({ "text": text, "language": "en", "segments": [] }).to_string()
    }

    #[tokio::test]
    async fn test_writes_exercise_and_points_record_at_it() {
        let (ctx, objects) = context();
        let key = LessonKey::new("Level2", "Lesson5", "A");
        objects.insert(
            "official/Level2/Lesson5/A/passage2/a_subtitles.json",
            subtitle("Farmers bring fresh vegetables to the market every Saturday morning."),
        );
        objects.insert(
            "official/Level2/Lesson5/A/passage1/a_subtitles.json",
            subtitle("The small village sits quietly beside a wide and gentle river."),
        );
        objects.insert("official/Level2/Lesson5/A/passage1/a_listening.mp3", "audio");

        let outcome = synthesize(&ctx, &key).await.unwrap();
        let SynthesisOutcome::Written { path, sources, .. } = outcome else {
            panic!("expected a written exercise, got {:?}", outcome);
        };
        assert_eq!(path, "official/Level2/Lesson5/A/dictation.json");
        assert_eq!(sources, 2);

        let stored = ctx.store.get_exercise(&key).await.unwrap().unwrap();
        assert_eq!(stored.lesson_id, "Level2_Lesson5_A");
        // passage 1 text leads even though passage 2 was stored first
        assert!(stored.text.starts_with("The small village"));

        let written = objects.read(&path).await.unwrap().unwrap();
        let from_object: DictationExercise = serde_json::from_slice(&written).unwrap();
        assert_eq!(from_object, stored);

        let record = ctx.store.load_record(&key).await.unwrap().unwrap().value;
        assert_eq!(record.dictation_path.as_deref(), Some(path.as_str()));
        assert!(record.has_mode(Mode::Dictation));
    }

    #[tokio::test]
    async fn test_skips_without_enough_text() {
        let (ctx, objects) = context();
        let key = LessonKey::new("Level2", "Lesson5", "A");

        assert_eq!(
            synthesize(&ctx, &key).await.unwrap(),
            SynthesisOutcome::Skipped {
                reason: SkipCause::NoSubtitles
            }
        );

        objects.insert("official/Level2/Lesson5/A/passage1/a_subtitles.json", subtitle("Hi."));
        assert_eq!(
            synthesize(&ctx, &key).await.unwrap(),
            SynthesisOutcome::Skipped {
                reason: SkipCause::InsufficientText
            }
        );
        assert!(ctx.store.get_exercise(&key).await.unwrap().is_none());
        assert!(ctx.store.load_record(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_exercise_rebuilt_as_passages_arrive() {
        let (ctx, objects) = context();
        let key = LessonKey::new("Level3", "Lesson1", "B");
        let passage2 = "official/Level3/Lesson1/B/passage2/b_subtitles.json";

        objects.insert("official/Level3/Lesson1/B/passage1/b_subtitles.json", subtitle("Hi."));
        assert_eq!(
            synthesize(&ctx, &key).await.unwrap(),
            SynthesisOutcome::Skipped {
                reason: SkipCause::InsufficientText
            }
        );

        objects.insert(
            passage2,
            subtitle("Farmers bring fresh vegetables to the market every Saturday morning."),
        );
        let first = synthesize(&ctx, &key).await.unwrap();
        let SynthesisOutcome::Written { sources, record, .. } = &first else {
            panic!("expected a written exercise, got {:?}", first);
        };
        assert_eq!(*sources, 2);
        assert_eq!(*record, ApplyOutcome::Written { version: 1, attempts: 1 });
        let before = ctx.store.get_exercise(&key).await.unwrap().unwrap();
        assert!(before.text.contains("Farmers"));

        // a corrected transcript replaces the exercise; the record already points at it
        objects.insert(
            passage2,
            subtitle("Every winter the lake freezes and families skate across it together."),
        );
        let second = synthesize(&ctx, &key).await.unwrap();
        let SynthesisOutcome::Written { path, record, .. } = &second else {
            panic!("expected a written exercise, got {:?}", second);
        };
        assert_eq!(*record, ApplyOutcome::Unchanged { version: 1 });

        let after = ctx.store.get_exercise(&key).await.unwrap().unwrap();
        assert!(after.text.contains("lake"));
        assert!(!after.text.contains("Farmers"));
        assert_ne!(after.parts, before.parts);

        let written = objects.read(path).await.unwrap().unwrap();
        let from_object: DictationExercise = serde_json::from_slice(&written).unwrap();
        assert_eq!(from_object, after);
    }

    #[tokio::test]
    async fn test_malformed_subtitle_aborts() {
        let (ctx, objects) = context();
        let key = LessonKey::new("Level2", "Lesson5", "A");
        objects.insert("official/Level2/Lesson5/A/passage1/a_subtitles.json", "{oops");

        let err = synthesize(&ctx, &key).await.unwrap_err();
        assert!(err.downcast_ref::<MalformedTranscript>().is_some());
        assert!(ctx.store.get_exercise(&key).await.unwrap().is_none());
    }
}
