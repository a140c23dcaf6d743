//! Filesystem-backed [`ObjectStore`].
//!
//! Logical paths map onto files under a root directory, so a local mirror
//! of the content bucket can stand in for the bucket itself.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

use lesson_sync_core::objects::ObjectStore;

use crate::scan::logical_path;

pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a logical path, refusing anything that escapes the root.
    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path);
        if !relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
        {
            bail!("invalid object path: {}", path);
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn read(&self, path: &str) -> Result<Option<Vec<u8>>> {
        let file = self.resolve(path)?;
        match tokio::fs::read(&file).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", file.display())),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let root = self.root.clone();
        let prefix = prefix.to_string();
        tokio::task::spawn_blocking(move || -> Result<Vec<String>> {
            let mut paths = Vec::new();
            if !root.exists() {
                return Ok(paths);
            }
            for entry in WalkDir::new(&root) {
                let entry = entry?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let logical = logical_path(&root, entry.path());
                if logical.starts_with(&prefix) {
                    paths.push(logical);
                }
            }
            paths.sort();
            Ok(paths)
        })
        .await?
    }

    async fn write(&self, path: &str, bytes: &[u8]) -> Result<()> {
        let file = self.resolve(path)?;
        if let Some(parent) = file.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&file, bytes)
            .await
            .with_context(|| format!("Failed to write {}", file.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_read_list() {
        let tmp = tempfile::TempDir::new().unwrap();
        let store = FsObjectStore::new(tmp.path());

        store
            .write("official/Level1/Lesson1/A/dictation.json", b"{}")
            .await
            .unwrap();
        store
            .write("official/Level1/Lesson1/B/dictation.json", b"{}")
            .await
            .unwrap();

        assert_eq!(
            store.read("official/Level1/Lesson1/A/dictation.json").await.unwrap(),
            Some(b"{}".to_vec())
        );
        assert!(store.read("official/none.json").await.unwrap().is_none());
        assert_eq!(
            store.list("official/Level1/Lesson1/A/").await.unwrap(),
            vec!["official/Level1/Lesson1/A/dictation.json"]
        );
    }

    #[tokio::test]
    async fn test_rejects_escaping_paths() {
        let tmp = tempfile::TempDir::new().unwrap();
        let store = FsObjectStore::new(tmp.path());
        assert!(store.read("../etc/passwd").await.is_err());
        assert!(store.write("/abs/file", b"x").await.is_err());
    }
}
