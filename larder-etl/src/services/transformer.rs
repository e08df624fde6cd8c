//! Transform phase
//!
//! Flattens raw source records into normalized `Recipe`s:
//! - records without a natural key are skipped
//! - the first record for a natural key wins, later ones are skipped
//! - ingredient names and measures are normalized; unusable names are
//!   dropped, and a recipe keeps the first line for each normalized name

use std::collections::HashSet;
use tracing::debug;

use super::normalizer::{normalize_ingredient_name, normalize_measure};
use crate::error::{EtlError, EtlResult};
use crate::models::{Ingredient, NaturalKey, RawRecipe, Recipe};

/// Normalized batch plus what was left behind
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransformOutput {
    pub recipes: Vec<Recipe>,
    pub skipped_missing_key: usize,
    pub skipped_duplicates: usize,
    pub dropped_ingredients: usize,
}

impl TransformOutput {
    /// Raw records that did not become recipes
    pub fn skipped_records(&self) -> usize {
        self.skipped_missing_key + self.skipped_duplicates
    }
}

/// Normalize a raw batch
///
/// Fails with `EtlError::Transform` when a source name is not a slug
/// (lowercase letters, digits, `_` or `-`), since `recipe_nk` could no
/// longer be split unambiguously.
pub fn transform_recipes(raw: &[RawRecipe]) -> EtlResult<TransformOutput> {
    let mut output = TransformOutput::default();
    let mut seen: HashSet<NaturalKey> = HashSet::new();

    for record in raw {
        let Some(key) = record.natural_key() else {
            output.skipped_missing_key += 1;
            continue;
        };

        if !is_source_slug(&key.source_name) {
            return Err(EtlError::Transform(format!(
                "source_name '{}' of record '{}' is not a valid source slug",
                key.source_name, key.source_id
            )));
        }

        if !seen.insert(key.clone()) {
            debug!(recipe_nk = %key, "Skipping duplicate recipe");
            output.skipped_duplicates += 1;
            continue;
        }

        let (ingredients, dropped) = normalize_ingredients(record);
        output.dropped_ingredients += dropped;

        output.recipes.push(Recipe {
            source_name: key.source_name,
            source_id: key.source_id,
            name: clean(record.name.as_deref()),
            category: clean(record.category.as_deref()),
            area: clean(record.area.as_deref()),
            instructions: clean(record.instructions.as_deref()),
            thumbnail: clean(record.thumbnail.as_deref()),
            ingredients,
        });
    }

    Ok(output)
}

fn normalize_ingredients(record: &RawRecipe) -> (Vec<Ingredient>, usize) {
    let mut names: HashSet<String> = HashSet::new();
    let mut ingredients = Vec::new();
    let mut dropped = 0;

    for entry in &record.ingredients {
        let name = entry.ingredient.as_deref().and_then(normalize_ingredient_name);
        match name {
            Some(name) if names.insert(name.clone()) => ingredients.push(Ingredient {
                name,
                measure: entry.measure.as_deref().and_then(normalize_measure),
            }),
            _ => dropped += 1,
        }
    }

    (ingredients, dropped)
}

fn clean(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn is_source_slug(name: &str) -> bool {
    name.chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::IngredientEntry;

    fn raw(source: &str, id: Option<&str>, ingredients: &[(&str, &str)]) -> RawRecipe {
        RawRecipe {
            source_name: Some(source.to_string()),
            source_id: id.map(str::to_string),
            name: Some(" Pancakes ".into()),
            category: Some("".into()),
            ingredients: ingredients
                .iter()
                .map(|(name, measure)| IngredientEntry::new(*name, Some(*measure)))
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_skips_missing_keys_and_duplicates() {
        let batch = vec![
            raw("themealdb", Some("1"), &[("Eggs", "2")]),
            raw("themealdb", None, &[]),
            raw("themealdb", Some("1"), &[("Milk", "1 cup")]),
            raw("spoonacular", Some("1"), &[]),
        ];

        let output = transform_recipes(&batch).unwrap();
        assert_eq!(output.recipes.len(), 2);
        assert_eq!(output.skipped_missing_key, 1);
        assert_eq!(output.skipped_duplicates, 1);
        assert_eq!(output.skipped_records(), 2);

        // First occurrence wins
        assert_eq!(output.recipes[0].ingredients[0].name, "egg");
    }

    #[test]
    fn test_cleans_fields_and_normalizes_ingredients() {
        let batch = vec![raw(
            "themealdb",
            Some("7"),
            &[("Eggs", " 2 "), ("egg", "1"), ("", "pinch"), ("Sugar", "to taste")],
        )];

        let output = transform_recipes(&batch).unwrap();
        let recipe = &output.recipes[0];
        assert_eq!(recipe.name.as_deref(), Some("Pancakes"));
        assert!(recipe.category.is_none());
        assert_eq!(recipe.recipe_nk(), "themealdb:7");
        assert_eq!(
            recipe.ingredients,
            vec![
                Ingredient { name: "egg".into(), measure: Some("2".into()) },
                Ingredient { name: "sugar".into(), measure: None },
            ]
        );
        assert_eq!(output.dropped_ingredients, 2);
    }

    #[test]
    fn test_rejects_non_slug_source_name() {
        let batch = vec![raw("the:mealdb", Some("1"), &[])];
        match transform_recipes(&batch) {
            Err(EtlError::Transform(msg)) => assert!(msg.contains("the:mealdb")),
            other => panic!("expected transform error, got {:?}", other),
        }
    }
}
