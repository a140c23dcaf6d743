//! In-memory [`LessonStore`] for tests and embedding.
//!
//! Uses `BTreeMap` behind `std::sync::RwLock`; the version check and the
//! write happen under one write lock, which gives the same compare-and-swap
//! semantics as the SQLite backend.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{DictationExercise, LessonKey, LessonRecord};

use super::{LessonStore, Versioned, WriteConflict};

#[derive(Default)]
pub struct InMemoryLessonStore {
    records: RwLock<BTreeMap<LessonKey, Versioned<LessonRecord>>>,
    exercises: RwLock<BTreeMap<LessonKey, DictationExercise>>,
}

impl InMemoryLessonStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LessonStore for InMemoryLessonStore {
    async fn load_record(&self, key: &LessonKey) -> Result<Option<Versioned<LessonRecord>>> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        Ok(records.get(key).cloned())
    }

    async fn save_record(
        &self,
        key: &LessonKey,
        record: &LessonRecord,
        expected: Option<u64>,
    ) -> Result<u64> {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        let found = records.get(key).map(|v| v.version);
        if found != expected {
            return Err(WriteConflict {
                key: key.to_string(),
                expected,
                found,
            }
            .into());
        }
        let version = found.unwrap_or(0) + 1;
        records.insert(
            key.clone(),
            Versioned {
                version,
                value: record.clone(),
            },
        );
        Ok(version)
    }

    async fn list_records(&self) -> Result<Vec<(LessonKey, Versioned<LessonRecord>)>> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        Ok(records
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    async fn put_exercise(&self, key: &LessonKey, exercise: &DictationExercise) -> Result<()> {
        let mut exercises = self.exercises.write().unwrap_or_else(PoisonError::into_inner);
        exercises.insert(key.clone(), exercise.clone());
        Ok(())
    }

    async fn get_exercise(&self, key: &LessonKey) -> Result<Option<DictationExercise>> {
        let exercises = self.exercises.read().unwrap_or_else(PoisonError::into_inner);
        Ok(exercises.get(key).cloned())
    }
}
