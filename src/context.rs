//! Explicit handles passed to every pipeline stage.

use anyhow::Result;
use std::sync::Arc;

use lesson_sync_core::cloze::ClozeParams;
use lesson_sync_core::objects::ObjectStore;
use lesson_sync_core::store::LessonStore;

use crate::aggregate::RetryPolicy;
use crate::config::Config;
use crate::db;
use crate::objects::FsObjectStore;
use crate::sqlite_store::SqliteLessonStore;

/// Store clients plus the settings the pipeline reads on every event.
///
/// Cheap to clone; clones share the underlying stores.
#[derive(Clone)]
pub struct PipelineContext {
    pub store: Arc<dyn LessonStore>,
    pub objects: Arc<dyn ObjectStore>,
    /// Recognized official-content namespace.
    pub namespace: String,
    pub retry: RetryPolicy,
    pub cloze: ClozeParams,
}

impl PipelineContext {
    pub fn new(
        store: Arc<dyn LessonStore>,
        objects: Arc<dyn ObjectStore>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            store,
            objects,
            namespace: namespace.into(),
            retry: RetryPolicy::default(),
            cloze: ClozeParams::default(),
        }
    }

    /// SQLite records plus the content root as object store.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let pool = db::connect(config).await?;
        Ok(Self {
            store: Arc::new(SqliteLessonStore::new(pool)),
            objects: Arc::new(FsObjectStore::new(&config.content.root)),
            namespace: config.content.namespace.clone(),
            retry: RetryPolicy::from(&config.aggregator),
            cloze: config.dictation.cloze_params(),
        })
    }
}
