//! ETL orchestrator
//!
//! Sequences one run:
//! EXTRACT → raw gate → TRANSFORM → processed gate → LOAD → COMPLETED
//!
//! Every run gets a fresh `etl_runs` row. Any error in any phase is recorded
//! with `fail_run` and then returned; the run context is passed explicitly
//! to each phase.

use chrono::Utc;
use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::config::PipelineSettings;
use crate::db::{
    staging::{self, StagingCounts},
    warehouse,
};
use crate::error::{EtlError, EtlResult};
use crate::models::{
    EtlPhase, EtlRun, LoadOutcome, PhaseUpdate, QualitySummary, RawRecipe, Recipe, RunStatus,
};
use crate::quality::{QualityChecker, QualityPolicy, Record};
use crate::services::{
    transform_recipes, IncrementalLoader, LocalObjectStore, ObjectStore, RawCache, RecipeExtractor,
    RecipeSource, RunContext, RunTracker, SnapshotStore, SourceError, SpoonacularClient,
    TheMealDbClient,
};

/// Behavior switches for one pipeline invocation
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOptions {
    /// Enforce quality gates; when false failures are logged only
    pub validate_quality: bool,
    pub extract_timeout: Duration,
    /// Fail runs left `running` longer than this before starting
    pub stale_run_after: Option<chrono::Duration>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        let settings = PipelineSettings::default();
        Self::from(&settings)
    }
}

impl From<&PipelineSettings> for PipelineOptions {
    fn from(settings: &PipelineSettings) -> Self {
        Self {
            validate_quality: settings.validate_quality,
            extract_timeout: settings.extract_timeout(),
            stale_run_after: settings.stale_run_after(),
        }
    }
}

/// Outcome of a completed run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub status: RunStatus,
    pub raw_record_count: usize,
    pub processed_record_count: usize,
    pub skipped_record_count: usize,
    pub staging: StagingCounts,
    pub load: LoadOutcome,
    /// Summary of the processed-data gate
    pub quality: QualitySummary,
    pub raw_file_path: PathBuf,
    pub processed_file_path: PathBuf,
    pub object_uri: String,
    pub duration_ms: u64,
}

pub struct Orchestrator {
    db: SqlitePool,
    tracker: RunTracker,
    extractor: RecipeExtractor,
    snapshots: SnapshotStore,
    object_store: Arc<dyn ObjectStore>,
    loader: IncrementalLoader,
    policy: QualityPolicy,
    options: PipelineOptions,
}

impl Orchestrator {
    pub fn new(
        db: SqlitePool,
        extractor: RecipeExtractor,
        data_dir: &Path,
        object_store: Arc<dyn ObjectStore>,
        policy: QualityPolicy,
        options: PipelineOptions,
    ) -> Self {
        Self {
            tracker: RunTracker::new(db.clone()),
            loader: IncrementalLoader::new(db.clone()),
            snapshots: SnapshotStore::new(data_dir),
            db,
            extractor,
            object_store,
            policy,
            options,
        }
    }

    /// Wire the production sources, raw cache and local bucket
    ///
    /// Spoonacular is skipped with a warning when no API key is configured.
    pub fn from_settings(
        db: SqlitePool,
        data_dir: &Path,
        settings: &PipelineSettings,
        policy: QualityPolicy,
        spoonacular_api_key: Option<String>,
    ) -> EtlResult<Self> {
        let mut sources: Vec<Arc<dyn RecipeSource>> = Vec::new();

        if !settings.themealdb_categories.is_empty() {
            sources.push(Arc::new(TheMealDbClient::new(
                settings.themealdb_categories.clone(),
            )?));
        }

        match spoonacular_api_key {
            Some(key) if !settings.spoonacular_types.is_empty() => {
                sources.push(Arc::new(SpoonacularClient::new(
                    key,
                    settings.spoonacular_types.clone(),
                )?));
            }
            Some(_) => tracing::info!("No Spoonacular dish types configured, source disabled"),
            None => tracing::warn!("Spoonacular API key not set; skipping Spoonacular fetch"),
        }

        let extractor = RecipeExtractor::new(sources)
            .with_cache(RawCache::new(data_dir.join("raw")), settings.refresh);
        let object_store = Arc::new(LocalObjectStore::new(settings.bucket_dir(data_dir)));

        Ok(Self::new(
            db,
            extractor,
            data_dir,
            object_store,
            policy,
            PipelineOptions::from(settings),
        ))
    }

    pub fn tracker(&self) -> &RunTracker {
        &self.tracker
    }

    pub async fn get_latest_run_status(&self) -> EtlResult<Option<EtlRun>> {
        self.tracker.get_latest_run_status().await
    }

    /// Execute one full run
    pub async fn run_pipeline(&self) -> EtlResult<RunSummary> {
        if let Some(max_age) = self.options.stale_run_after {
            self.tracker.fail_stale_runs(max_age).await?;
        }

        let ctx = self.tracker.start_run().await?;
        tracing::info!(
            run_id = %ctx.run_id(),
            sources = ?self.extractor.source_names(),
            validate_quality = self.options.validate_quality,
            "ETL pipeline started"
        );

        match self.execute(&ctx).await {
            Ok(summary) => Ok(summary),
            Err(e) => {
                let message = e.to_string();
                if let Err(track_err) = self.tracker.fail_run(ctx.run_id(), &message).await {
                    tracing::error!(
                        run_id = %ctx.run_id(),
                        error = %track_err,
                        "Failed to record run failure"
                    );
                }
                Err(e)
            }
        }
    }

    async fn execute(&self, ctx: &RunContext) -> EtlResult<RunSummary> {
        let run_id = ctx.run_id();

        // Phase 1: EXTRACT
        let (raw, raw_path) = self.extract_phase(ctx).await?;
        self.quality_gate(ctx, "raw", &raw)?;

        // Phase 2: TRANSFORM
        let transform_started = Utc::now();
        self.tracker
            .record_phase(run_id, EtlPhase::Transform, &PhaseUpdate::started(transform_started))
            .await?;
        tracing::info!(run_id = %run_id, records = raw.len(), "Phase 2: TRANSFORM");

        let transformed = transform_recipes(&raw)?;
        let processed_path = self
            .snapshots
            .write_processed(run_id, &transformed.recipes)
            .await?;

        self.tracker
            .record_phase(
                run_id,
                EtlPhase::Transform,
                &PhaseUpdate::ended(Utc::now())
                    .with_record_count(transformed.recipes.len())
                    .with_file_path(processed_path.display().to_string())
                    .with_skipped_count(transformed.skipped_records()),
            )
            .await?;
        tracing::info!(
            run_id = %run_id,
            processed = transformed.recipes.len(),
            missing_key = transformed.skipped_missing_key,
            duplicates = transformed.skipped_duplicates,
            dropped_ingredients = transformed.dropped_ingredients,
            "Transform phase complete"
        );

        let quality = self.quality_gate(ctx, "processed", &transformed.recipes)?;

        // Phase 3: LOAD
        self.tracker
            .record_phase(run_id, EtlPhase::Load, &PhaseUpdate::started(Utc::now()))
            .await?;
        tracing::info!(run_id = %run_id, recipes = transformed.recipes.len(), "Phase 3: LOAD");

        let (staging_counts, object_uri, load) = self
            .load_phase(ctx, &transformed.recipes, &processed_path)
            .await?;

        self.tracker
            .record_phase(
                run_id,
                EtlPhase::Load,
                &PhaseUpdate::ended(Utc::now()).with_record_count(load.inserted),
            )
            .await?;

        self.tracker.complete_run(run_id, &quality).await?;

        let duration_ms = ctx.elapsed().as_millis() as u64;
        tracing::info!(
            run_id = %run_id,
            duration_ms,
            inserted = load.inserted,
            "ETL pipeline completed"
        );

        Ok(RunSummary {
            run_id,
            status: RunStatus::Completed,
            raw_record_count: raw.len(),
            processed_record_count: transformed.recipes.len(),
            skipped_record_count: transformed.skipped_records(),
            staging: staging_counts,
            load,
            quality,
            raw_file_path: raw_path,
            processed_file_path: processed_path,
            object_uri,
            duration_ms,
        })
    }

    /// Pull from every source within the extract budget and snapshot the result
    async fn extract_phase(&self, ctx: &RunContext) -> EtlResult<(Vec<RawRecipe>, PathBuf)> {
        let run_id = ctx.run_id();
        tracing::info!(run_id = %run_id, "Phase 1: EXTRACT");

        let extracted =
            match tokio::time::timeout(self.options.extract_timeout, self.extractor.extract())
                .await
            {
                Ok(result) => result?,
                Err(_) => {
                    return Err(EtlError::Extraction(SourceError::Timeout(
                        self.options.extract_timeout,
                    )))
                }
            };

        let raw_path = self.snapshots.write_raw(run_id, &extracted.records).await?;

        self.tracker
            .record_phase(
                run_id,
                EtlPhase::Extract,
                &PhaseUpdate::ended(Utc::now())
                    .with_record_count(extracted.records.len())
                    .with_file_path(raw_path.display().to_string()),
            )
            .await?;
        tracing::info!(
            run_id = %run_id,
            records = extracted.records.len(),
            duplicates = extracted.duplicates,
            cache_hits = extracted.cache_hits,
            path = %raw_path.display(),
            "Extract phase complete"
        );

        Ok((extracted.records, raw_path))
    }

    /// Run the composite policy; blocks only when validation is enabled
    fn quality_gate<R: Record>(
        &self,
        ctx: &RunContext,
        stage: &str,
        batch: &[R],
    ) -> EtlResult<QualitySummary> {
        let mut checker = QualityChecker::new()
            .with_raise_on_failure(self.options.validate_quality)
            .with_min_pass_rate(self.policy.min_pass_rate);
        checker.check_recipe_data_quality(batch, &self.policy);
        checker.log_summary(stage);

        if !self.options.validate_quality && !checker.is_acceptable() {
            tracing::warn!(
                run_id = %ctx.run_id(),
                stage,
                "Quality gate failed but validation is disabled; continuing"
            );
        }

        checker.verdict(stage)
    }

    /// Stage, publish, refresh dimensions and merge facts
    async fn load_phase(
        &self,
        ctx: &RunContext,
        recipes: &[Recipe],
        processed_path: &Path,
    ) -> EtlResult<(StagingCounts, String, LoadOutcome)> {
        let run_id = ctx.run_id();
        let now = Utc::now();

        let staging_counts = staging::stage_recipes(&self.db, recipes, now)
            .await
            .map_err(|e| load_error("staging recipes", e))?;
        tracing::debug!(run_id = %run_id, counts = ?staging_counts, "Staged recipes");

        let key = processed_path
            .file_name()
            .map(|name| format!("processed/{}", name.to_string_lossy()))
            .ok_or_else(|| {
                EtlError::Load(format!(
                    "Processed snapshot path has no file name: {}",
                    processed_path.display()
                ))
            })?;
        let object_uri = self
            .object_store
            .put(&key, processed_path)
            .await
            .map_err(|e| load_error("publishing processed snapshot", e))?;

        let staged_recipes = warehouse::read_staged_recipes(&self.db)
            .await
            .map_err(|e| load_error("reading stg_recipes", e))?;
        let staged_facts = warehouse::read_staged_facts(&self.db)
            .await
            .map_err(|e| load_error("reading stg_recipe_ingredients", e))?;
        let ingredient_names: Vec<String> = staged_facts
            .iter()
            .map(|f| f.ingredient_name.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        warehouse::upsert_recipe_dimensions(&self.db, &staged_recipes, now)
            .await
            .map_err(|e| load_error("upserting dim_recipe", e))?;
        warehouse::upsert_ingredient_dimensions(&self.db, &ingredient_names, now)
            .await
            .map_err(|e| load_error("upserting dim_ingredient", e))?;

        let load = self.loader.load(run_id, &staged_facts).await?;

        Ok((staging_counts, object_uri, load))
    }
}

fn load_error(step: &str, err: larder_common::Error) -> EtlError {
    EtlError::Load(format!("{}: {}", step, err))
}
