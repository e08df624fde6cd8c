//! Incremental fact loader
//!
//! Merges a staged fact batch into `fct_recipe_ingredients` so that repeated
//! and overlapping runs accumulate each `(recipe_key, ingredient_key)` pair
//! exactly once.
//!
//! Planning is pure: resolve surrogate keys, drop orphans, anti-join against
//! existing keys, keep the first occurrence of a key within the batch.
//! Applying the plan is a single transaction.

use chrono::Utc;
use sqlx::SqlitePool;
use std::collections::HashSet;
use tracing::{debug, info};
use uuid::Uuid;

use crate::db::warehouse;
use crate::error::{EtlError, EtlResult};
use crate::models::{DimensionLookups, FactKey, FactRow, LoadOutcome, StagedFact};

/// Rows to insert plus the counts of everything dropped
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadPlan {
    pub rows: Vec<FactRow>,
    pub skipped_orphans: usize,
    pub skipped_existing: usize,
    pub skipped_duplicates: usize,
}

/// Plan an incremental merge
///
/// Rows whose recipe or ingredient has no dimension entry are orphans.
pub fn plan_load(
    batch: &[StagedFact],
    lookups: &DimensionLookups,
    existing: &HashSet<FactKey>,
) -> LoadPlan {
    let mut plan = LoadPlan::default();
    let mut planned: HashSet<FactKey> = HashSet::new();

    for fact in batch {
        let recipe_key = lookups.recipes.get(&fact.recipe_nk);
        let ingredient_key = lookups.ingredients.get(&fact.ingredient_name);

        let (Some(recipe_key), Some(ingredient_key)) = (recipe_key, ingredient_key) else {
            debug!(
                recipe_nk = %fact.recipe_nk,
                ingredient = %fact.ingredient_name,
                "Dropping orphan fact row"
            );
            plan.skipped_orphans += 1;
            continue;
        };

        let row = FactRow {
            recipe_key: recipe_key.clone(),
            ingredient_key: ingredient_key.clone(),
            measure: fact.measure.clone(),
        };
        let key = row.key();

        if existing.contains(&key) {
            plan.skipped_existing += 1;
        } else if !planned.insert(key) {
            plan.skipped_duplicates += 1;
        } else {
            plan.rows.push(row);
        }
    }

    plan
}

/// Applies load plans against the warehouse tables
#[derive(Debug, Clone)]
pub struct IncrementalLoader {
    db: SqlitePool,
}

impl IncrementalLoader {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Read lookups and existing keys, plan, then insert in one transaction
    pub async fn load(&self, run_id: Uuid, batch: &[StagedFact]) -> EtlResult<LoadOutcome> {
        let lookups = warehouse::load_dimension_lookups(&self.db)
            .await
            .map_err(|e| EtlError::Load(format!("Reading dimension lookups: {}", e)))?;
        let existing = warehouse::load_fact_keys(&self.db)
            .await
            .map_err(|e| EtlError::Load(format!("Reading existing fact keys: {}", e)))?;

        let plan = plan_load(batch, &lookups, &existing);
        self.apply(run_id, plan).await
    }

    /// Insert a plan's rows, stamped with the current time
    pub async fn apply(&self, run_id: Uuid, plan: LoadPlan) -> EtlResult<LoadOutcome> {
        let planned = plan.rows.len();
        let inserted = warehouse::insert_facts(&self.db, &plan.rows, run_id, Utc::now())
            .await
            .map_err(|e| EtlError::Load(format!("Inserting fact rows: {}", e)))?
            as usize;

        // Keys another run inserted after planning count as existing
        let outcome = LoadOutcome {
            inserted,
            skipped_orphans: plan.skipped_orphans,
            skipped_existing: plan.skipped_existing + planned.saturating_sub(inserted),
            skipped_duplicates: plan.skipped_duplicates,
        };

        info!(
            run_id = %run_id,
            inserted = outcome.inserted,
            orphans = outcome.skipped_orphans,
            existing = outcome.skipped_existing,
            duplicates = outcome.skipped_duplicates,
            "Incremental fact load complete"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NaturalKey;
    use crate::services::dimension_key::{ingredient_key, recipe_key};

    fn lookups(recipes: &[(&str, &str)], ingredients: &[&str]) -> DimensionLookups {
        let mut lookups = DimensionLookups::default();
        for (source, id) in recipes {
            let nk = NaturalKey::new(source, id);
            lookups.recipes.insert(nk.to_string(), recipe_key(&nk));
        }
        for name in ingredients {
            lookups.ingredients.insert(name.to_string(), ingredient_key(name));
        }
        lookups
    }

    #[test]
    fn test_plan_inserts_all_new_rows() {
        let lookups = lookups(&[("themealdb", "1")], &["egg", "milk"]);
        let batch = vec![
            StagedFact::new("themealdb:1", "egg", Some("2")),
            StagedFact::new("themealdb:1", "milk", None),
        ];

        let plan = plan_load(&batch, &lookups, &HashSet::new());
        assert_eq!(plan.rows.len(), 2);
        assert_eq!(plan.skipped_orphans + plan.skipped_existing + plan.skipped_duplicates, 0);
    }

    #[test]
    fn test_plan_drops_orphans_existing_and_duplicates() {
        let lookups = lookups(&[("themealdb", "1")], &["egg", "milk"]);
        let existing: HashSet<FactKey> = [(
            recipe_key(&NaturalKey::new("themealdb", "1")),
            ingredient_key("egg"),
        )]
        .into_iter()
        .collect();

        let batch = vec![
            StagedFact::new("themealdb:1", "egg", Some("2")),
            StagedFact::new("themealdb:1", "milk", Some("1 cup")),
            StagedFact::new("themealdb:1", "milk", Some("2 cups")),
            StagedFact::new("themealdb:2", "milk", None),
            StagedFact::new("themealdb:1", "saffron", None),
        ];

        let plan = plan_load(&batch, &lookups, &existing);
        assert_eq!(plan.rows.len(), 1);
        assert_eq!(plan.rows[0].measure.as_deref(), Some("1 cup"));
        assert_eq!(plan.skipped_existing, 1);
        assert_eq!(plan.skipped_duplicates, 1);
        assert_eq!(plan.skipped_orphans, 2);
    }

    #[test]
    fn test_plan_is_empty_when_everything_exists() {
        let lookups = lookups(&[("themealdb", "1")], &["egg"]);
        let batch = vec![StagedFact::new("themealdb:1", "egg", None)];
        let first = plan_load(&batch, &lookups, &HashSet::new());
        let existing: HashSet<FactKey> = first.rows.iter().map(FactRow::key).collect();

        let second = plan_load(&batch, &lookups, &existing);
        assert!(second.rows.is_empty());
        assert_eq!(second.skipped_existing, 1);
    }
}
