//! Storage abstraction for lesson records and exercises.
//!
//! The [`LessonStore`] trait is the only concurrency primitive the
//! aggregator relies on: a versioned single-record compare-and-swap.
//! A write that loses a race fails with [`WriteConflict`] and the caller
//! re-reads and reapplies.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

use crate::models::{DictationExercise, LessonKey, LessonRecord};

/// A stored value plus the version it was read at.
///
/// Versions start at 1 for the first write and increase by one per write.
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
    pub version: u64,
    pub value: T,
}

/// The record changed between read and write.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("write conflict on {key}: expected version {expected:?}, found {found:?}")]
pub struct WriteConflict {
    pub key: String,
    /// `None` means the writer expected the record to be absent.
    pub expected: Option<u64>,
    pub found: Option<u64>,
}

/// True when `err` is (or wraps) a [`WriteConflict`].
pub fn is_write_conflict(err: &anyhow::Error) -> bool {
    err.downcast_ref::<WriteConflict>().is_some()
}

/// Abstract backend holding one record and at most one exercise per key.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`load_record`](LessonStore::load_record) | Read a record with its version |
/// | [`save_record`](LessonStore::save_record) | Compare-and-swap write |
/// | [`list_records`](LessonStore::list_records) | All records, ordered by key |
/// | [`put_exercise`](LessonStore::put_exercise) | Overwrite the exercise for a key |
/// | [`get_exercise`](LessonStore::get_exercise) | Read the exercise for a key |
#[async_trait]
pub trait LessonStore: Send + Sync {
    async fn load_record(&self, key: &LessonKey) -> Result<Option<Versioned<LessonRecord>>>;

    /// Write `record` if the stored version still equals `expected`
    /// (`None`: the record must not exist yet).
    ///
    /// Returns the new version. Fails with [`WriteConflict`] otherwise.
    async fn save_record(
        &self,
        key: &LessonKey,
        record: &LessonRecord,
        expected: Option<u64>,
    ) -> Result<u64>;

    async fn list_records(&self) -> Result<Vec<(LessonKey, Versioned<LessonRecord>)>>;

    /// Last write wins.
    async fn put_exercise(&self, key: &LessonKey, exercise: &DictationExercise) -> Result<()>;

    async fn get_exercise(&self, key: &LessonKey) -> Result<Option<DictationExercise>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_survives_anyhow_context() {
        let err = anyhow::Error::new(WriteConflict {
            key: "Level1/Lesson1/A".into(),
            expected: Some(2),
            found: Some(3),
        })
        .context("saving record");
        assert!(is_write_conflict(&err));
        assert!(!is_write_conflict(&anyhow::anyhow!("disk full")));
    }
}
