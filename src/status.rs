//! Record and exercise overview.
//!
//! Used by `lsync status` to show what has converged so far: how many
//! lesson records and exercises exist, and per record which passages have
//! audio, subtitles and images.

use anyhow::Result;

use lesson_sync_core::models::{LessonKey, LessonRecord, Mode};
use lesson_sync_core::store::{LessonStore, Versioned};

use crate::config::Config;
use crate::context::PipelineContext;

/// One table row.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSummary {
    pub key: String,
    pub version: u64,
    pub passages: usize,
    pub with_audio: usize,
    pub with_subtitles: usize,
    pub images: usize,
    pub modes: String,
    pub has_exercise: bool,
    pub updated_at: Option<i64>,
}

impl RecordSummary {
    fn new(key: &LessonKey, record: &Versioned<LessonRecord>, has_exercise: bool) -> Self {
        let passages = &record.value.passages;
        Self {
            key: key.to_string(),
            version: record.version,
            passages: passages.len(),
            with_audio: passages.iter().filter(|p| p.audio_path.is_some()).count(),
            with_subtitles: passages.iter().filter(|p| p.subtitle_path.is_some()).count(),
            images: passages.iter().map(|p| p.image_paths.len()).sum(),
            modes: record
                .value
                .mode
                .iter()
                .map(Mode::as_str)
                .collect::<Vec<_>>()
                .join(","),
            has_exercise,
            updated_at: record.value.updated_at.map(|t| t.timestamp()),
        }
    }
}

pub async fn summarize<S>(store: &S) -> Result<Vec<RecordSummary>>
where
    S: LessonStore + ?Sized,
{
    let mut rows = Vec::new();
    for (key, record) in store.list_records().await? {
        let has_exercise = store.get_exercise(&key).await?.is_some();
        rows.push(RecordSummary::new(&key, &record, has_exercise));
    }
    Ok(rows)
}

/// Run the status command: query the store and print a summary.
pub async fn run_status(config: &Config) -> Result<()> {
    let ctx = PipelineContext::from_config(config).await?;
    let rows = summarize(ctx.store.as_ref()).await?;

    let exercises = rows.iter().filter(|r| r.has_exercise).count();
    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("lesson-sync status");
    println!("==================");
    println!();
    println!("  Database:    {}", config.db.path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!("  Content:     {}", config.content.root.display());
    println!();
    println!("  Records:     {}", rows.len());
    println!("  Exercises:   {} / {}", exercises, rows.len());

    if !rows.is_empty() {
        println!();
        println!(
            "  {:<28} {:>4} {:>8} {:>6} {:>5} {:>6}  {:<30} {}",
            "KEY", "VER", "PASSAGES", "AUDIO", "SUBS", "IMAGES", "MODES", "UPDATED"
        );
        println!("  {}", "-".repeat(106));

        for r in &rows {
            let updated = match r.updated_at {
                Some(ts) => format_ts_relative(ts),
                None => "never".to_string(),
            };
            let modes = if r.has_exercise {
                format!("{} (+exercise)", r.modes)
            } else {
                r.modes.clone()
            };
            println!(
                "  {:<28} {:>4} {:>8} {:>6} {:>5} {:>6}  {:<30} {}",
                r.key, r.version, r.passages, r.with_audio, r.with_subtitles, r.images, modes, updated
            );
        }
    }

    println!();
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

/// Format a Unix timestamp as a relative time string (e.g. "3 hours ago").
fn format_ts_relative(ts: i64) -> String {
    let now = chrono::Utc::now().timestamp();
    let delta = now - ts;

    if delta < 0 {
        return format_ts_iso(ts);
    }

    if delta < 60 {
        "just now".to_string()
    } else if delta < 3600 {
        let mins = delta / 60;
        format!("{} min{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if delta < 86400 {
        let hours = delta / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else if delta < 86400 * 30 {
        let days = delta / 86400;
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    } else {
        format_ts_iso(ts)
    }
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lesson_sync_core::classify::classify;
    use lesson_sync_core::merge::merge_event;
    use lesson_sync_core::store::memory::InMemoryLessonStore;

    #[tokio::test]
    async fn test_summary_counts() {
        let store = InMemoryLessonStore::new();
        let key = LessonKey::new("Level1", "Lesson1", "A");
        let mut record = LessonRecord::empty();
        for path in [
            "official/Level1/Lesson1/A/passage1/a_listening.mp3",
            "official/Level1/Lesson1/A/passage1/img_a_1_a.png",
            "official/Level1/Lesson1/A/passage1/img_a_1_b.png",
            "official/Level1/Lesson1/A/passage2/a_subtitles.json",
        ] {
            merge_event(&mut record, &classify(path).into_event().unwrap());
        }
        store.save_record(&key, &record, None).await.unwrap();

        let rows = summarize(&store).await.unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.key, "Level1/Lesson1/A");
        assert_eq!(row.passages, 2);
        assert_eq!(row.with_audio, 1);
        assert_eq!(row.with_subtitles, 1);
        assert_eq!(row.images, 2);
        assert_eq!(row.modes, "listening,overlapping");
        assert!(!row.has_exercise);
    }

    #[test]
    fn test_format_helpers() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        let now = chrono::Utc::now().timestamp();
        assert_eq!(format_ts_relative(now), "just now");
        assert_eq!(format_ts_relative(now - 7200), "2 hours ago");
    }
}
