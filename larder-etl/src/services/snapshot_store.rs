//! Staged file snapshots
//!
//! Each run leaves a raw snapshot under `raw/` and a processed snapshot
//! under `processed/`, both JSON, so any run can be inspected or replayed
//! from disk.

use chrono::Utc;
use larder_common::Result;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use super::raw_cache::write_json_atomic;
use crate::models::{RawRecipe, Recipe};

#[derive(Debug, Clone)]
pub struct SnapshotStore {
    raw_dir: PathBuf,
    processed_dir: PathBuf,
}

impl SnapshotStore {
    /// Snapshots live under `<data_dir>/raw` and `<data_dir>/processed`
    pub fn new(data_dir: &Path) -> Self {
        Self {
            raw_dir: data_dir.join("raw"),
            processed_dir: data_dir.join("processed"),
        }
    }

    pub fn raw_dir(&self) -> &Path {
        &self.raw_dir
    }

    /// `raw/recipes_<run_id>_<YYYYmmddTHHMMSSZ>.json`
    pub async fn write_raw(&self, run_id: Uuid, records: &[RawRecipe]) -> Result<PathBuf> {
        let stamp = Utc::now().format("%Y%m%dT%H%M%SZ");
        let path = self
            .raw_dir
            .join(format!("recipes_{}_{}.json", run_id, stamp));
        write_json_atomic(&path, &serde_json::to_vec_pretty(records)?).await?;
        Ok(path)
    }

    pub async fn read_raw(&self, path: &Path) -> Result<Vec<RawRecipe>> {
        let content = tokio::fs::read(path).await?;
        Ok(serde_json::from_slice(&content)?)
    }

    /// `processed/recipes_<run_id>.json`
    pub async fn write_processed(&self, run_id: Uuid, recipes: &[Recipe]) -> Result<PathBuf> {
        let path = self.processed_dir.join(format!("recipes_{}.json", run_id));
        write_json_atomic(&path, &serde_json::to_vec_pretty(recipes)?).await?;
        Ok(path)
    }

    pub async fn read_processed(&self, path: &Path) -> Result<Vec<Recipe>> {
        let content = tokio::fs::read(path).await?;
        Ok(serde_json::from_slice(&content)?)
    }
}
