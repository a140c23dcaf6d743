//! Convergent aggregator.
//!
//! Applies one classified event as a read-modify-write transaction against
//! the event's lesson record:
//!
//! 1. load the record and its version (absent → empty record),
//! 2. merge the event with the pure field rules in
//!    [`lesson_sync_core::merge`],
//! 3. compare-and-swap the result back at the loaded version.
//!
//! A lost race surfaces as [`WriteConflict`](lesson_sync_core::store::WriteConflict);
//! the whole read-modify-write is retried with linear backoff up to
//! [`RetryPolicy::max_attempts`]. There is no other locking.

use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

use lesson_sync_core::classify::ClassifiedEvent;
use lesson_sync_core::merge::merge_event;
use lesson_sync_core::models::LessonRecord;
use lesson_sync_core::store::{is_write_conflict, LessonStore};

use crate::config::AggregatorConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Sleep before attempt `n + 1` is `backoff * n`.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&AggregatorConfig::default())
    }
}

impl From<&AggregatorConfig> for RetryPolicy {
    fn from(config: &AggregatorConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            backoff: Duration::from_millis(config.backoff_ms),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ApplyOutcome {
    /// The event was already reflected in the record; nothing written.
    Unchanged { version: u64 },
    Written { version: u64, attempts: u32 },
}

impl ApplyOutcome {
    pub fn version(&self) -> u64 {
        match self {
            ApplyOutcome::Unchanged { version } | ApplyOutcome::Written { version, .. } => *version,
        }
    }

    pub fn is_written(&self) -> bool {
        matches!(self, ApplyOutcome::Written { .. })
    }
}

/// Merge `event` into its record, retrying on write conflicts.
pub async fn apply_event<S>(
    store: &S,
    event: &ClassifiedEvent,
    policy: &RetryPolicy,
) -> Result<ApplyOutcome>
where
    S: LessonStore + ?Sized,
{
    let key = &event.key;
    let mut attempt = 1;

    loop {
        let current = store.load_record(key).await?;
        let (mut record, expected) = match current {
            Some(v) => (v.value, Some(v.version)),
            None => (LessonRecord::empty(), None),
        };

        if !merge_event(&mut record, event) {
            debug!(%key, path = %event.path, kind = %event.kind, "event already applied");
            return Ok(ApplyOutcome::Unchanged {
                version: expected.unwrap_or_default(),
            });
        }
        record.updated_at = Some(Utc::now());

        match store.save_record(key, &record, expected).await {
            Ok(version) => {
                debug!(
                    %key,
                    path = %event.path,
                    kind = %event.kind,
                    passage = ?event.passage,
                    version,
                    attempt,
                    "record updated"
                );
                return Ok(ApplyOutcome::Written {
                    version,
                    attempts: attempt,
                });
            }
            Err(err) if is_write_conflict(&err) => {
                if attempt >= policy.max_attempts {
                    warn!(%key, path = %event.path, attempt, "giving up after repeated write conflicts");
                    return Err(err.context(format!(
                        "record {} still contended after {} attempts",
                        key, attempt
                    )));
                }
                debug!(%key, path = %event.path, attempt, "write conflict, retrying");
                tokio::time::sleep(policy.backoff * attempt).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
