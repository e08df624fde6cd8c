//! Recipe records
//!
//! `RawRecipe` is what a source hands back: every field optional, ingredient
//! names untouched. `Recipe` is the normalized form produced by the transform
//! phase, with a guaranteed natural key.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One ingredient line as delivered by a source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngredientEntry {
    pub ingredient: Option<String>,
    pub measure: Option<String>,
}

impl IngredientEntry {
    pub fn new(ingredient: impl Into<String>, measure: Option<&str>) -> Self {
        Self {
            ingredient: Some(ingredient.into()),
            measure: measure.map(str::to_string),
        }
    }

    /// True when the line carries a non-blank ingredient name
    pub fn is_named(&self) -> bool {
        self.ingredient
            .as_deref()
            .map(|name| !name.trim().is_empty())
            .unwrap_or(false)
    }
}

/// Recipe record before normalization
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecipe {
    #[serde(default)]
    pub source_name: Option<String>,
    #[serde(default)]
    pub source_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub area: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub ingredients: Vec<IngredientEntry>,
}

impl RawRecipe {
    /// Natural key, if both halves are present and non-blank
    pub fn natural_key(&self) -> Option<NaturalKey> {
        let source_name = non_blank(self.source_name.as_deref())?;
        let source_id = non_blank(self.source_id.as_deref())?;
        Some(NaturalKey::new(source_name, source_id))
    }

    /// Number of ingredient lines with a usable name
    pub fn named_ingredient_count(&self) -> usize {
        self.ingredients.iter().filter(|e| e.is_named()).count()
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// `(source_name, source_id)` pair identifying a recipe across sources
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NaturalKey {
    pub source_name: String,
    pub source_id: String,
}

impl NaturalKey {
    pub fn new(source_name: &str, source_id: &str) -> Self {
        Self {
            source_name: source_name.to_string(),
            source_id: source_id.to_string(),
        }
    }
}

/// Renders as `recipe_nk`: `source_name:source_id`
impl fmt::Display for NaturalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source_name, self.source_id)
    }
}

/// Normalized ingredient line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    /// Normalized name (lowercase, singular, no measurement prefix)
    pub name: String,
    pub measure: Option<String>,
}

/// Recipe after the transform phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    pub source_name: String,
    pub source_id: String,
    pub name: Option<String>,
    pub category: Option<String>,
    pub area: Option<String>,
    pub instructions: Option<String>,
    pub thumbnail: Option<String>,
    pub ingredients: Vec<Ingredient>,
}

impl Recipe {
    pub fn natural_key(&self) -> NaturalKey {
        NaturalKey::new(&self.source_name, &self.source_id)
    }

    pub fn recipe_nk(&self) -> String {
        self.natural_key().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_natural_key_requires_both_halves() {
        let mut raw = RawRecipe {
            source_name: Some("themealdb".into()),
            source_id: Some("52772".into()),
            ..Default::default()
        };
        assert_eq!(raw.natural_key().unwrap().to_string(), "themealdb:52772");

        raw.source_id = Some("   ".into());
        assert!(raw.natural_key().is_none());

        raw.source_id = None;
        assert!(raw.natural_key().is_none());
    }

    #[test]
    fn test_named_ingredient_count_ignores_blanks() {
        let raw = RawRecipe {
            ingredients: vec![
                IngredientEntry::new("Flour", Some("200g")),
                IngredientEntry::new("  ", None),
                IngredientEntry {
                    ingredient: None,
                    measure: Some("1 tsp".into()),
                },
            ],
            ..Default::default()
        };
        assert_eq!(raw.named_ingredient_count(), 1);
    }

    #[test]
    fn test_raw_recipe_tolerates_missing_fields() {
        let raw: RawRecipe = serde_json::from_str(r#"{"source_name":"spoonacular"}"#).unwrap();
        assert_eq!(raw.source_name.as_deref(), Some("spoonacular"));
        assert!(raw.ingredients.is_empty());
    }
}
