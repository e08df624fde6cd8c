//! Operational staging tables
//!
//! `recipes`, `ingredients` and `recipe_ingredients` are upserted on their
//! natural keys, so re-staging a batch refreshes rows instead of duplicating
//! them. The `stg_*` views read from these tables.

use chrono::{DateTime, Utc};
use larder_common::time::to_db;
use larder_common::Result;
use serde::Serialize;
use sqlx::SqlitePool;

use crate::models::Recipe;

/// Table sizes after a staging pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StagingCounts {
    pub recipes: u64,
    pub ingredients: u64,
    pub recipe_ingredients: u64,
}

/// Upsert a normalized batch in one transaction
pub async fn stage_recipes(
    pool: &SqlitePool,
    recipes: &[Recipe],
    now: DateTime<Utc>,
) -> Result<StagingCounts> {
    let updated_at = to_db(&now);
    let mut tx = pool.begin().await?;

    for recipe in recipes {
        sqlx::query(
            r#"
            INSERT INTO recipes (
                source_name, source_id, name, category, area,
                instructions, thumbnail, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(source_name, source_id) DO UPDATE SET
                name = excluded.name,
                category = excluded.category,
                area = excluded.area,
                instructions = excluded.instructions,
                thumbnail = excluded.thumbnail,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&recipe.source_name)
        .bind(&recipe.source_id)
        .bind(&recipe.name)
        .bind(&recipe.category)
        .bind(&recipe.area)
        .bind(&recipe.instructions)
        .bind(&recipe.thumbnail)
        .bind(&updated_at)
        .execute(&mut *tx)
        .await?;

        for ingredient in &recipe.ingredients {
            sqlx::query(
                r#"
                INSERT INTO ingredients (name, normalized_name)
                VALUES (?, ?)
                ON CONFLICT(normalized_name) DO NOTHING
                "#,
            )
            .bind(&ingredient.name)
            .bind(&ingredient.name)
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                r#"
                INSERT INTO recipe_ingredients (recipe_id, ingredient_id, measure)
                SELECT r.id, i.id, ?
                FROM recipes r, ingredients i
                WHERE r.source_name = ? AND r.source_id = ? AND i.normalized_name = ?
                ON CONFLICT(recipe_id, ingredient_id) DO UPDATE SET
                    measure = excluded.measure
                "#,
            )
            .bind(&ingredient.measure)
            .bind(&recipe.source_name)
            .bind(&recipe.source_id)
            .bind(&ingredient.name)
            .execute(&mut *tx)
            .await?;
        }
    }

    tx.commit().await?;

    count_staged(pool).await
}

pub async fn count_staged(pool: &SqlitePool) -> Result<StagingCounts> {
    let count = |table: &'static str| async move {
        let sql = format!("SELECT COUNT(*) FROM {}", table);
        sqlx::query_scalar::<_, i64>(&sql)
            .fetch_one(pool)
            .await
            .map(|n| n as u64)
    };

    Ok(StagingCounts {
        recipes: count("recipes").await?,
        ingredients: count("ingredients").await?,
        recipe_ingredients: count("recipe_ingredients").await?,
    })
}
