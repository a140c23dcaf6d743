//! Backfill: deliver every file under the content root as a notification.
//!
//! Events are applied concurrently (bounded by `--jobs`) through the same
//! aggregator live notifications use; convergence makes the order
//! irrelevant. Dictation is then rebuilt once per key that saw a subtitle,
//! instead of once per subtitle.

use anyhow::{bail, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, warn};

use lesson_sync_core::classify::{classify_in, ArtifactKind, Classification};
use lesson_sync_core::models::LessonKey;

use crate::aggregate::apply_event;
use crate::config::Config;
use crate::context::PipelineContext;
use crate::scan::scan_content;
use crate::synthesize::synthesize;

pub async fn run_sync(
    config: &Config,
    jobs: usize,
    dry_run: bool,
    limit: Option<usize>,
) -> Result<()> {
    let mut files = scan_content(config)?;
    if let Some(lim) = limit {
        files.truncate(lim);
    }

    let namespace = &config.content.namespace;
    let mut events = Vec::new();
    let mut skipped: BTreeMap<&'static str, usize> = BTreeMap::new();
    for file in &files {
        match classify_in(namespace, &file.logical_path) {
            Classification::Artifact(event) => events.push(event),
            Classification::Skip(reason) => *skipped.entry(reason.as_str()).or_default() += 1,
        }
    }
    let skipped_total: usize = skipped.values().sum();

    if dry_run {
        let mut by_kind: BTreeMap<&'static str, usize> = BTreeMap::new();
        for event in &events {
            *by_kind.entry(event.kind.as_str()).or_default() += 1;
        }
        println!("sync {} (dry-run)", config.content.root.display());
        println!("  files found: {}", files.len());
        for (kind, count) in &by_kind {
            println!("  {}: {}", kind, count);
        }
        println!("  skipped: {}", skipped_total);
        for (reason, count) in &skipped {
            println!("    {}: {}", reason, count);
        }
        return Ok(());
    }

    let ctx = PipelineContext::from_config(config).await?;

    let subtitle_keys: BTreeSet<LessonKey> = events
        .iter()
        .filter(|e| e.kind == ArtifactKind::PassageSubtitle)
        .map(|e| e.key.clone())
        .collect();

    let semaphore = Arc::new(Semaphore::new(jobs.max(1)));
    let mut tasks = JoinSet::new();
    for event in events {
        let permit = Arc::clone(&semaphore).acquire_owned().await?;
        let ctx = ctx.clone();
        tasks.spawn(async move {
            let _permit = permit;
            let outcome = apply_event(ctx.store.as_ref(), &event, &ctx.retry).await;
            (event, outcome)
        });
    }

    let mut records_written = 0u64;
    let mut unchanged = 0u64;
    let mut failed = 0u64;
    while let Some(joined) = tasks.join_next().await {
        let (event, outcome) = joined?;
        match outcome {
            Ok(o) if o.is_written() => records_written += 1,
            Ok(_) => unchanged += 1,
            Err(e) => {
                error!(path = %event.path, key = %event.key, error = %e, "event not applied");
                failed += 1;
            }
        }
    }

    let mut exercises_written = 0u64;
    let mut exercises_skipped = 0u64;
    for key in &subtitle_keys {
        match synthesize(&ctx, key).await {
            Ok(o) if o.is_written() => exercises_written += 1,
            Ok(_) => exercises_skipped += 1,
            Err(e) => {
                warn!(%key, error = %e, "dictation not rebuilt");
                failed += 1;
            }
        }
    }

    println!("sync {}", config.content.root.display());
    println!("  files seen: {}", files.len());
    println!("  events applied: {}", records_written + unchanged);
    println!("  skipped: {}", skipped_total);
    println!("  records written: {}", records_written);
    println!("  exercises written: {}", exercises_written);
    println!("  exercises skipped: {}", exercises_skipped);
    if failed > 0 {
        println!("  failed: {}", failed);
        bail!("{} events or exercises failed, see log", failed);
    }
    println!("ok");

    Ok(())
}
