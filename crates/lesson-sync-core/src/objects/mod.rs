//! Object storage abstraction.
//!
//! Content files are addressed by logical path
//! (`official/Level3/Lesson2/B/passage1/b_subtitles.json`). Synthesis reads
//! transcripts through this trait and writes the exercise document back.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Object bytes, or `None` when no object exists at `path`.
    async fn read(&self, path: &str) -> Result<Option<Vec<u8>>>;

    /// Logical paths starting with `prefix`, sorted.
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;

    /// Create or replace the object at `path`.
    async fn write(&self, path: &str, bytes: &[u8]) -> Result<()>;
}
