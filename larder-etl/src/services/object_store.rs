//! Object store publication
//!
//! Processed snapshots are published under a key; the store returns the
//! object's URI.

use async_trait::async_trait;
use larder_common::{Error, Result};
use std::path::{Component, Path, PathBuf};
use tracing::debug;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload `local_path` as `key`; returns the object URI
    async fn put(&self, key: &str, local_path: &Path) -> Result<String>;
}

/// Bucket backed by a local directory
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    bucket_dir: PathBuf,
}

impl LocalObjectStore {
    pub fn new(bucket_dir: impl Into<PathBuf>) -> Self {
        Self {
            bucket_dir: bucket_dir.into(),
        }
    }

    fn object_path(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let is_plain = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !is_plain {
            return Err(Error::InvalidInput(format!("Invalid object key '{}'", key)));
        }
        Ok(self.bucket_dir.join(relative))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(&self, key: &str, local_path: &Path) -> Result<String> {
        let target = self.object_path(key)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = tokio::fs::copy(local_path, &target).await?;
        debug!(key, bytes, "Published object");

        Ok(format!("file://{}", target.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_put_copies_into_bucket() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("snapshot.json");
        std::fs::write(&source, b"[]").unwrap();

        let store = LocalObjectStore::new(temp.path().join("bucket"));
        let uri = store.put("processed/recipes_1.json", &source).await.unwrap();

        let target = temp.path().join("bucket").join("processed").join("recipes_1.json");
        assert_eq!(std::fs::read(&target).unwrap(), b"[]");
        assert!(uri.starts_with("file://"));
        assert!(uri.ends_with("recipes_1.json"));
    }

    #[tokio::test]
    async fn test_rejects_escaping_keys() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("snapshot.json");
        std::fs::write(&source, b"[]").unwrap();

        let store = LocalObjectStore::new(temp.path().join("bucket"));
        assert!(store.put("../outside.json", &source).await.is_err());
        assert!(store.put("/abs.json", &source).await.is_err());
        assert!(store.put("", &source).await.is_err());
    }
}
