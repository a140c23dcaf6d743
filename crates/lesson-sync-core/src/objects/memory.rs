//! In-memory [`ObjectStore`].

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use anyhow::Result;
use async_trait::async_trait;

use super::ObjectStore;

#[derive(Default)]
pub struct InMemoryObjectStore {
    objects: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object without going through the async trait.
    pub fn insert(&self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        let mut objects = self.objects.write().unwrap_or_else(PoisonError::into_inner);
        objects.insert(path.into(), bytes.into());
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn read(&self, path: &str) -> Result<Option<Vec<u8>>> {
        let objects = self.objects.read().unwrap_or_else(PoisonError::into_inner);
        Ok(objects.get(path).cloned())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let objects = self.objects.read().unwrap_or_else(PoisonError::into_inner);
        Ok(objects
            .range(prefix.to_string()..)
            .map(|(path, _)| path)
            .take_while(|path| path.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn write(&self, path: &str, bytes: &[u8]) -> Result<()> {
        self.insert(path, bytes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_list_by_prefix() {
        let store = InMemoryObjectStore::new();
        store.insert("official/L1/A/x.json", "1");
        store.insert("official/L1/B/y.json", "2");
        store.insert("official/L10/A/z.json", "3");

        assert_eq!(
            store.list("official/L1/").await.unwrap(),
            vec!["official/L1/A/x.json", "official/L1/B/y.json"]
        );
        store.write("official/L1/A/x.json", b"9").await.unwrap();
        assert_eq!(
            store.read("official/L1/A/x.json").await.unwrap(),
            Some(b"9".to_vec())
        );
        assert!(store.read("missing").await.unwrap().is_none());
    }
}
