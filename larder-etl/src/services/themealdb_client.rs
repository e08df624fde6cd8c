//! TheMealDB client
//!
//! Two-step fetch per category: `filter.php?c=<category>` lists meal ids,
//! then `lookup.php?i=<id>` returns the full meal with up to twenty
//! `strIngredientN` / `strMeasureN` pairs.
//!
//! API reference: https://www.themealdb.com/api.php

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::{info, warn};

use super::http::JsonClient;
use super::recipe_source::{RecipeSource, SourceError};
use crate::models::{IngredientEntry, RawRecipe};

pub const THEMEALDB_BASE_URL: &str = "https://www.themealdb.com/api/json/v1/1";

pub const SOURCE_NAME: &str = "themealdb";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Polite pacing between detail lookups
const REQUEST_INTERVAL: Duration = Duration::from_millis(100);

const MAX_INGREDIENT_SLOTS: usize = 20;

#[derive(Debug, Deserialize)]
struct MealList {
    meals: Option<Vec<MealSummary>>,
}

#[derive(Debug, Deserialize)]
struct MealSummary {
    #[serde(rename = "idMeal")]
    id_meal: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MealDetail {
    meals: Option<Vec<Map<String, Value>>>,
}

pub struct TheMealDbClient {
    http: JsonClient,
    base_url: String,
    categories: Vec<String>,
}

impl TheMealDbClient {
    pub fn new(categories: Vec<String>) -> Result<Self, SourceError> {
        Ok(Self {
            http: JsonClient::new(DEFAULT_TIMEOUT, REQUEST_INTERVAL)?,
            base_url: THEMEALDB_BASE_URL.to_string(),
            categories,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn list_meal_ids(&self, category: &str) -> Result<BTreeSet<String>, SourceError> {
        let url = format!("{}/filter.php", self.base_url);
        let list: MealList = self.http.get_json(&url, &[("c", category.to_string())]).await?;

        Ok(list
            .meals
            .unwrap_or_default()
            .into_iter()
            .filter_map(|m| m.id_meal)
            .filter(|id| !id.trim().is_empty())
            .collect())
    }

    async fn lookup_meal(&self, meal_id: &str) -> Result<Option<Map<String, Value>>, SourceError> {
        let url = format!("{}/lookup.php", self.base_url);
        let detail: MealDetail = self.http.get_json(&url, &[("i", meal_id.to_string())]).await?;
        Ok(detail.meals.and_then(|meals| meals.into_iter().next()))
    }
}

#[async_trait]
impl RecipeSource for TheMealDbClient {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    fn categories(&self) -> &[String] {
        &self.categories
    }

    async fn fetch_category(&self, category: &str) -> Result<Vec<RawRecipe>, SourceError> {
        let ids = self.list_meal_ids(category).await?;
        info!(source = SOURCE_NAME, category, meals = ids.len(), "Fetching meal details");

        let mut recipes = Vec::with_capacity(ids.len());
        for meal_id in &ids {
            match self.lookup_meal(meal_id).await? {
                Some(meal) => recipes.push(normalize_meal(&meal)),
                None => warn!(
                    source = SOURCE_NAME,
                    category,
                    meal_id = %meal_id,
                    "No detail returned for meal"
                ),
            }
        }

        Ok(recipes)
    }
}

/// Map a `lookup.php` meal object to a raw recipe
pub fn normalize_meal(meal: &Map<String, Value>) -> RawRecipe {
    let ingredients = (1..=MAX_INGREDIENT_SLOTS)
        .filter_map(|i| {
            let name = text(meal, &format!("strIngredient{}", i))?;
            let measure = text(meal, &format!("strMeasure{}", i));
            Some(IngredientEntry {
                ingredient: Some(name),
                measure,
            })
        })
        .collect();

    RawRecipe {
        source_name: Some(SOURCE_NAME.to_string()),
        source_id: text(meal, "idMeal"),
        name: text(meal, "strMeal"),
        category: text(meal, "strCategory"),
        area: text(meal, "strArea"),
        instructions: text(meal, "strInstructions"),
        thumbnail: text(meal, "strMealThumb"),
        ingredients,
    }
}

/// Trimmed, non-empty string (or number) field
fn text(meal: &Map<String, Value>, key: &str) -> Option<String> {
    match meal.get(key)? {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_meal_collects_ingredient_slots() {
        let meal = json!({
            "idMeal": "52772",
            "strMeal": "Teriyaki Chicken Casserole",
            "strCategory": "Chicken",
            "strArea": "Japanese",
            "strInstructions": "Preheat oven...",
            "strMealThumb": "https://example.invalid/thumb.jpg",
            "strIngredient1": "soy sauce",
            "strMeasure1": "3/4 cup ",
            "strIngredient2": " water ",
            "strMeasure2": "",
            "strIngredient3": "",
            "strMeasure3": "1 tsp",
            "strIngredient4": null,
            "strIngredient20": "garlic",
            "strMeasure20": null
        });

        let recipe = normalize_meal(meal.as_object().unwrap());
        assert_eq!(recipe.source_name.as_deref(), Some("themealdb"));
        assert_eq!(recipe.source_id.as_deref(), Some("52772"));
        assert_eq!(recipe.area.as_deref(), Some("Japanese"));
        assert_eq!(
            recipe.ingredients,
            vec![
                IngredientEntry::new("soy sauce", Some("3/4 cup")),
                IngredientEntry::new("water", None),
                IngredientEntry::new("garlic", None),
            ]
        );
    }

    #[test]
    fn test_empty_category_listing_parses() {
        let list: MealList = serde_json::from_str(r#"{"meals": null}"#).unwrap();
        assert!(list.meals.is_none());
    }
}
