//! Per-source, per-category cache of extracted records
//!
//! Layout: `<raw_dir>/<source>/<category-slug>.json`. A cache hit skips the
//! upstream API entirely; `refresh` bypasses and rewrites it.

use larder_common::Result;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::models::RawRecipe;

#[derive(Debug, Clone)]
pub struct RawCache {
    dir: PathBuf,
}

impl RawCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, source: &str, category: &str) -> PathBuf {
        self.dir.join(slug(source)).join(format!("{}.json", slug(category)))
    }

    /// Cached records, or `None` on a miss
    ///
    /// An unreadable cache file counts as a miss.
    pub async fn load(&self, source: &str, category: &str) -> Result<Option<Vec<RawRecipe>>> {
        let path = self.path_for(source, category);
        let content = match tokio::fs::read(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_slice(&content) {
            Ok(records) => Ok(Some(records)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring corrupt cache file");
                Ok(None)
            }
        }
    }

    pub async fn store(
        &self,
        source: &str,
        category: &str,
        records: &[RawRecipe],
    ) -> Result<PathBuf> {
        let path = self.path_for(source, category);
        write_json_atomic(&path, &serde_json::to_vec_pretty(records)?).await?;
        Ok(path)
    }
}

/// Lowercase, runs of anything but `a-z0-9` collapsed to `-`
pub fn slug(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    for c in value.to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            slug.push(c);
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').to_string()
}

/// Write through a temporary sibling, then rename into place
pub(crate) async fn write_json_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}
