//! Database initialization
//!
//! Opens (or creates) the SQLite database and applies the schema. Every
//! statement is `IF NOT EXISTS`, so initialization is safe to repeat on each
//! startup.
//!
//! Table groups:
//! - Run tracking: `etl_runs`
//! - Operational staging: `recipes`, `ingredients`, `recipe_ingredients`
//!   plus the `stg_recipes` / `stg_recipe_ingredients` views
//! - Warehouse: `dim_recipe`, `dim_ingredient`, `fct_recipe_ingredients`

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Busy timeout applied to every connection (milliseconds)
pub const BUSY_TIMEOUT_MS: u64 = 5000;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // WAL lets readers (status queries) proceed while a run is writing
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(BUSY_TIMEOUT_MS));

    let pool = SqlitePoolOptions::new()
        .max_connections(8)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;

    Ok(pool)
}

/// Apply the full schema to an open pool
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_etl_runs_table(pool).await?;

    create_recipes_table(pool).await?;
    create_ingredients_table(pool).await?;
    create_recipe_ingredients_table(pool).await?;
    create_staging_views(pool).await?;

    create_dim_recipe_table(pool).await?;
    create_dim_ingredient_table(pool).await?;
    create_fct_recipe_ingredients_table(pool).await?;

    info!("Database schema ready (etl_runs, staging, warehouse)");
    Ok(())
}

pub async fn create_etl_runs_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS etl_runs (
            run_id TEXT PRIMARY KEY,
            status TEXT NOT NULL CHECK (status IN ('running', 'completed', 'failed')),
            run_started_at TEXT NOT NULL,
            extract_started_at TEXT,
            extract_ended_at TEXT,
            transform_started_at TEXT,
            transform_ended_at TEXT,
            load_started_at TEXT,
            load_ended_at TEXT,
            ended_at TEXT,
            raw_record_count INTEGER,
            processed_record_count INTEGER,
            loaded_record_count INTEGER,
            skipped_record_count INTEGER,
            raw_file_path TEXT,
            processed_file_path TEXT,
            quality_summary TEXT,
            error_message TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_etl_runs_started ON etl_runs(run_started_at)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_etl_runs_status ON etl_runs(status)")
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn create_recipes_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS recipes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            source_name TEXT NOT NULL,
            source_id TEXT NOT NULL,
            name TEXT,
            category TEXT,
            area TEXT,
            instructions TEXT,
            thumbnail TEXT,
            updated_at TEXT NOT NULL,
            UNIQUE (source_name, source_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn create_ingredients_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS ingredients (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT,
            normalized_name TEXT NOT NULL UNIQUE
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn create_recipe_ingredients_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS recipe_ingredients (
            recipe_id INTEGER NOT NULL,
            ingredient_id INTEGER NOT NULL,
            measure TEXT,
            PRIMARY KEY (recipe_id, ingredient_id),
            FOREIGN KEY (recipe_id) REFERENCES recipes(id) ON DELETE CASCADE,
            FOREIGN KEY (ingredient_id) REFERENCES ingredients(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Staging views consumed by the dimensional models
///
/// Column names are a contract: `recipe_nk, source_name, source_id,
/// ingredient_name, measure, name, category, area, instructions`.
pub async fn create_staging_views(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE VIEW IF NOT EXISTS stg_recipes AS
        SELECT
            source_name || ':' || source_id AS recipe_nk,
            source_name,
            source_id,
            name,
            category,
            area,
            instructions,
            thumbnail
        FROM recipes
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE VIEW IF NOT EXISTS stg_recipe_ingredients AS
        SELECT
            r.source_name || ':' || r.source_id AS recipe_nk,
            r.source_name,
            r.source_id,
            i.normalized_name AS ingredient_name,
            ri.measure,
            r.name,
            r.category,
            r.area,
            r.instructions
        FROM recipe_ingredients ri
        JOIN recipes r ON r.id = ri.recipe_id
        JOIN ingredients i ON i.id = ri.ingredient_id
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn create_dim_recipe_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS dim_recipe (
            recipe_key TEXT PRIMARY KEY,
            recipe_nk TEXT NOT NULL UNIQUE,
            source_name TEXT NOT NULL,
            source_id TEXT NOT NULL,
            name TEXT,
            category TEXT,
            area TEXT,
            instructions TEXT,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn create_dim_ingredient_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS dim_ingredient (
            ingredient_key TEXT PRIMARY KEY,
            ingredient_name TEXT NOT NULL UNIQUE,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn create_fct_recipe_ingredients_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS fct_recipe_ingredients (
            recipe_key TEXT NOT NULL REFERENCES dim_recipe(recipe_key),
            ingredient_key TEXT NOT NULL REFERENCES dim_ingredient(ingredient_key),
            measure TEXT,
            run_id TEXT NOT NULL,
            inserted_at TEXT NOT NULL,
            PRIMARY KEY (recipe_key, ingredient_key)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
