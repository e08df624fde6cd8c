//! Warehouse persistence
//!
//! Dimensions are rebuilt from the staging views; facts are only ever
//! inserted, never updated, guarded by the composite primary key.

use chrono::{DateTime, Utc};
use larder_common::time::to_db;
use larder_common::Result;
use sqlx::{Row, SqlitePool};
use std::collections::HashSet;
use uuid::Uuid;

use crate::models::{
    DimensionKey, DimensionLookups, FactKey, FactRow, NaturalKey, StagedFact, StagedRecipe,
};
use crate::services::dimension_key::{ingredient_key, recipe_key};

/// Every row of `stg_recipes`
pub async fn read_staged_recipes(pool: &SqlitePool) -> Result<Vec<StagedRecipe>> {
    let rows = sqlx::query(
        r#"
        SELECT recipe_nk, source_name, source_id, name, category, area, instructions
        FROM stg_recipes
        ORDER BY recipe_nk
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| -> Result<StagedRecipe> {
            Ok(StagedRecipe {
                recipe_nk: row.try_get("recipe_nk")?,
                source_name: row.try_get("source_name")?,
                source_id: row.try_get("source_id")?,
                name: row.try_get("name")?,
                category: row.try_get("category")?,
                area: row.try_get("area")?,
                instructions: row.try_get("instructions")?,
            })
        })
        .collect()
}

/// Every row of `stg_recipe_ingredients`, in staging order
pub async fn read_staged_facts(pool: &SqlitePool) -> Result<Vec<StagedFact>> {
    let rows = sqlx::query(
        r#"
        SELECT recipe_nk, ingredient_name, measure
        FROM stg_recipe_ingredients
        ORDER BY recipe_nk, ingredient_name
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| -> Result<StagedFact> {
            Ok(StagedFact {
                recipe_nk: row.try_get("recipe_nk")?,
                ingredient_name: row.try_get("ingredient_name")?,
                measure: row.try_get("measure")?,
            })
        })
        .collect()
}

/// Insert or refresh recipe dimension rows; returns rows written
pub async fn upsert_recipe_dimensions(
    pool: &SqlitePool,
    recipes: &[StagedRecipe],
    now: DateTime<Utc>,
) -> Result<u64> {
    let updated_at = to_db(&now);
    let mut tx = pool.begin().await?;
    let mut written = 0;

    for recipe in recipes {
        let key = recipe_key(&NaturalKey::new(&recipe.source_name, &recipe.source_id));
        let result = sqlx::query(
            r#"
            INSERT INTO dim_recipe (
                recipe_key, recipe_nk, source_name, source_id,
                name, category, area, instructions, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(recipe_key) DO UPDATE SET
                name = excluded.name,
                category = excluded.category,
                area = excluded.area,
                instructions = excluded.instructions,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key.as_str())
        .bind(&recipe.recipe_nk)
        .bind(&recipe.source_name)
        .bind(&recipe.source_id)
        .bind(&recipe.name)
        .bind(&recipe.category)
        .bind(&recipe.area)
        .bind(&recipe.instructions)
        .bind(&updated_at)
        .execute(&mut *tx)
        .await?;
        written += result.rows_affected();
    }

    tx.commit().await?;
    Ok(written)
}

/// Insert ingredient dimension rows not yet present; returns rows inserted
pub async fn upsert_ingredient_dimensions(
    pool: &SqlitePool,
    names: &[String],
    now: DateTime<Utc>,
) -> Result<u64> {
    let updated_at = to_db(&now);
    let mut tx = pool.begin().await?;
    let mut inserted = 0;

    for name in names {
        let result = sqlx::query(
            r#"
            INSERT INTO dim_ingredient (ingredient_key, ingredient_name, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(ingredient_key) DO NOTHING
            "#,
        )
        .bind(ingredient_key(name).as_str())
        .bind(name)
        .bind(&updated_at)
        .execute(&mut *tx)
        .await?;
        inserted += result.rows_affected();
    }

    tx.commit().await?;
    Ok(inserted)
}

/// Natural attribute to surrogate key maps for both dimensions
pub async fn load_dimension_lookups(pool: &SqlitePool) -> Result<DimensionLookups> {
    let mut lookups = DimensionLookups::default();

    let recipes = sqlx::query("SELECT recipe_nk, recipe_key FROM dim_recipe")
        .fetch_all(pool)
        .await?;
    for row in &recipes {
        lookups.recipes.insert(
            row.try_get("recipe_nk")?,
            DimensionKey::new(row.try_get("recipe_key")?),
        );
    }

    let ingredients = sqlx::query("SELECT ingredient_name, ingredient_key FROM dim_ingredient")
        .fetch_all(pool)
        .await?;
    for row in &ingredients {
        lookups.ingredients.insert(
            row.try_get("ingredient_name")?,
            DimensionKey::new(row.try_get("ingredient_key")?),
        );
    }

    Ok(lookups)
}

/// Composite keys already present in `fct_recipe_ingredients`
pub async fn load_fact_keys(pool: &SqlitePool) -> Result<HashSet<FactKey>> {
    let rows = sqlx::query("SELECT recipe_key, ingredient_key FROM fct_recipe_ingredients")
        .fetch_all(pool)
        .await?;

    rows.iter()
        .map(|row| -> Result<FactKey> {
            Ok((
                DimensionKey::new(row.try_get("recipe_key")?),
                DimensionKey::new(row.try_get("ingredient_key")?),
            ))
        })
        .collect()
}

/// Insert fact rows in one transaction; returns rows actually inserted
///
/// Keys inserted by an overlapping run since planning are skipped by
/// `ON CONFLICT DO NOTHING`.
pub async fn insert_facts(
    pool: &SqlitePool,
    rows: &[FactRow],
    run_id: Uuid,
    inserted_at: DateTime<Utc>,
) -> Result<u64> {
    let run_id = run_id.to_string();
    let inserted_at = to_db(&inserted_at);
    let mut tx = pool.begin().await?;
    let mut inserted = 0;

    for row in rows {
        let result = sqlx::query(
            r#"
            INSERT INTO fct_recipe_ingredients (
                recipe_key, ingredient_key, measure, run_id, inserted_at
            ) VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(recipe_key, ingredient_key) DO NOTHING
            "#,
        )
        .bind(row.recipe_key.as_str())
        .bind(row.ingredient_key.as_str())
        .bind(&row.measure)
        .bind(&run_id)
        .bind(&inserted_at)
        .execute(&mut *tx)
        .await?;
        inserted += result.rows_affected();
    }

    tx.commit().await?;
    Ok(inserted)
}

pub async fn count_facts(pool: &SqlitePool) -> Result<u64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM fct_recipe_ingredients")
        .fetch_one(pool)
        .await?;
    Ok(count as u64)
}
