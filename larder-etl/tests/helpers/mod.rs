//! Shared fixtures for larder-etl integration tests
//!
//! Every helper returns the `TempDir` that backs it; keep it alive for the
//! duration of the test.

#![allow(dead_code)]

use async_trait::async_trait;
use sqlx::SqlitePool;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use larder_etl::models::{IngredientEntry, RawRecipe};
use larder_etl::quality::QualityPolicy;
use larder_etl::services::{
    LocalObjectStore, ObjectStore, RawCache, RecipeExtractor, RecipeSource, SourceError,
};
use larder_etl::{Orchestrator, PipelineOptions};

/// Temporary database with the full schema applied
pub async fn create_test_db() -> (TempDir, SqlitePool) {
    let temp_dir = TempDir::new().unwrap();
    let pool = larder_common::db::init_database(&temp_dir.path().join("larder.db"))
        .await
        .unwrap();
    (temp_dir, pool)
}

pub async fn count_rows(pool: &SqlitePool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(pool)
        .await
        .unwrap()
}

/// Raw recipe with named ingredients and optional measures
pub fn raw_recipe(source: &str, id: &str, name: &str, ingredients: &[(&str, Option<&str>)]) -> RawRecipe {
    RawRecipe {
        source_name: Some(source.to_string()),
        source_id: Some(id.to_string()),
        name: Some(name.to_string()),
        category: Some("Dessert".to_string()),
        area: Some("British".to_string()),
        instructions: Some(format!("Make the {}.", name.to_lowercase())),
        thumbnail: None,
        ingredients: ingredients
            .iter()
            .map(|(ingredient, measure)| IngredientEntry::new(*ingredient, *measure))
            .collect(),
    }
}

/// Two well-formed recipes sharing "flour"; five distinct fact pairs
pub fn sample_recipes() -> Vec<RawRecipe> {
    vec![
        raw_recipe(
            "themealdb",
            "52772",
            "Teriyaki Chicken",
            &[
                ("Soy Sauce", Some("3/4 cup")),
                ("Chicken Breasts", Some("2")),
                ("Flour", Some("1 tbsp")),
            ],
        ),
        raw_recipe(
            "themealdb",
            "52893",
            "Apple Crumble",
            &[("Apples", Some("4")), ("flour", Some("200g"))],
        ),
    ]
}

/// Source returning a fixed batch for every category and counting calls
pub struct StaticSource {
    name: String,
    categories: Vec<String>,
    records: Vec<RawRecipe>,
    calls: AtomicU32,
}

impl StaticSource {
    pub fn new(name: &str, records: Vec<RawRecipe>) -> Self {
        Self {
            name: name.to_string(),
            categories: vec!["Dessert".to_string()],
            records,
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecipeSource for StaticSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn categories(&self) -> &[String] {
        &self.categories
    }

    async fn fetch_category(&self, _category: &str) -> Result<Vec<RawRecipe>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.records.clone())
    }
}

/// Source whose every request fails with an API error
pub struct FailingSource {
    categories: Vec<String>,
}

impl FailingSource {
    pub fn new() -> Self {
        Self {
            categories: vec!["Dessert".to_string()],
        }
    }
}

#[async_trait]
impl RecipeSource for FailingSource {
    fn name(&self) -> &str {
        "failing"
    }

    fn categories(&self) -> &[String] {
        &self.categories
    }

    async fn fetch_category(&self, _category: &str) -> Result<Vec<RawRecipe>, SourceError> {
        Err(SourceError::ApiError(503, "Service Unavailable".to_string()))
    }
}

/// Source that never answers within a test timeout
pub struct SlowSource {
    categories: Vec<String>,
    delay: Duration,
}

impl SlowSource {
    pub fn new(delay: Duration) -> Self {
        Self {
            categories: vec!["Dessert".to_string()],
            delay,
        }
    }
}

#[async_trait]
impl RecipeSource for SlowSource {
    fn name(&self) -> &str {
        "slow"
    }

    fn categories(&self) -> &[String] {
        &self.categories
    }

    async fn fetch_category(&self, _category: &str) -> Result<Vec<RawRecipe>, SourceError> {
        tokio::time::sleep(self.delay).await;
        Ok(Vec::new())
    }
}

/// Object store whose uploads are always refused
pub struct RejectingObjectStore;

#[async_trait]
impl ObjectStore for RejectingObjectStore {
    async fn put(&self, key: &str, _local_path: &Path) -> larder_common::Result<String> {
        Err(larder_common::Error::Internal(format!(
            "bucket unavailable, cannot upload '{}'",
            key
        )))
    }
}

/// Options for tests: validation on, short extract budget, no stale sweep
pub fn test_options() -> PipelineOptions {
    PipelineOptions {
        validate_quality: true,
        extract_timeout: Duration::from_secs(5),
        stale_run_after: None,
    }
}

/// Orchestrator over the given sources, without a raw cache
pub fn build_orchestrator(
    pool: &SqlitePool,
    data_dir: &TempDir,
    sources: Vec<Arc<dyn RecipeSource>>,
    options: PipelineOptions,
) -> Orchestrator {
    let extractor = RecipeExtractor::new(sources);
    orchestrator_with_extractor(pool, data_dir, extractor, options)
}

/// Orchestrator whose extractor reads and writes `data/raw`
pub fn build_cached_orchestrator(
    pool: &SqlitePool,
    data_dir: &TempDir,
    sources: Vec<Arc<dyn RecipeSource>>,
    refresh: bool,
) -> Orchestrator {
    let extractor = RecipeExtractor::new(sources)
        .with_cache(RawCache::new(data_dir.path().join("raw")), refresh);
    orchestrator_with_extractor(pool, data_dir, extractor, test_options())
}

/// Orchestrator publishing through the given object store
pub fn build_orchestrator_with_store(
    pool: &SqlitePool,
    data_dir: &TempDir,
    sources: Vec<Arc<dyn RecipeSource>>,
    object_store: Arc<dyn ObjectStore>,
) -> Orchestrator {
    Orchestrator::new(
        pool.clone(),
        RecipeExtractor::new(sources),
        data_dir.path(),
        object_store,
        QualityPolicy::default(),
        test_options(),
    )
}

fn orchestrator_with_extractor(
    pool: &SqlitePool,
    data_dir: &TempDir,
    extractor: RecipeExtractor,
    options: PipelineOptions,
) -> Orchestrator {
    let object_store = Arc::new(LocalObjectStore::new(data_dir.path().join("bucket")));
    Orchestrator::new(
        pool.clone(),
        extractor,
        data_dir.path(),
        object_store,
        QualityPolicy::default(),
        options,
    )
}
