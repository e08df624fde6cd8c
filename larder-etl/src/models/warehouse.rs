//! Warehouse rows and load bookkeeping

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Surrogate key of a dimension row (64-character lowercase hex digest)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DimensionKey(String);

impl DimensionKey {
    pub fn new(value: String) -> Self {
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DimensionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Row of the `stg_recipes` view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedRecipe {
    pub recipe_nk: String,
    pub source_name: String,
    pub source_id: String,
    pub name: Option<String>,
    pub category: Option<String>,
    pub area: Option<String>,
    pub instructions: Option<String>,
}

/// Row of the `stg_recipe_ingredients` view, reduced to what the fact needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFact {
    pub recipe_nk: String,
    pub ingredient_name: String,
    pub measure: Option<String>,
}

impl StagedFact {
    pub fn new(recipe_nk: &str, ingredient_name: &str, measure: Option<&str>) -> Self {
        Self {
            recipe_nk: recipe_nk.to_string(),
            ingredient_name: ingredient_name.to_string(),
            measure: measure.map(str::to_string),
        }
    }
}

/// Composite primary key of `fct_recipe_ingredients`
pub type FactKey = (DimensionKey, DimensionKey);

/// Fact row resolved to surrogate keys, ready to insert
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactRow {
    pub recipe_key: DimensionKey,
    pub ingredient_key: DimensionKey,
    pub measure: Option<String>,
}

impl FactRow {
    pub fn key(&self) -> FactKey {
        (self.recipe_key.clone(), self.ingredient_key.clone())
    }
}

/// Natural attribute to surrogate key, per dimension
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DimensionLookups {
    /// `recipe_nk -> recipe_key`
    pub recipes: HashMap<String, DimensionKey>,
    /// `ingredient_name -> ingredient_key`
    pub ingredients: HashMap<String, DimensionKey>,
}

/// Result of one incremental fact merge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadOutcome {
    pub inserted: usize,
    /// Rows with no matching recipe or ingredient dimension
    pub skipped_orphans: usize,
    /// Rows whose composite key was already loaded
    pub skipped_existing: usize,
    /// Repeats of a composite key within the batch
    pub skipped_duplicates: usize,
}

impl LoadOutcome {
    pub fn skipped(&self) -> usize {
        self.skipped_orphans + self.skipped_existing + self.skipped_duplicates
    }
}
