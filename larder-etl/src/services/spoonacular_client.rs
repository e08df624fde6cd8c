//! Spoonacular client
//!
//! Per dish type: `recipes/complexSearch` returns up to 100 recipe ids, then
//! one `recipes/informationBulk` call returns their details. Requires an API
//! key; without one the source is not constructed.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use std::time::Duration;
use tracing::info;

use super::http::JsonClient;
use super::recipe_source::{RecipeSource, SourceError};
use crate::models::{IngredientEntry, RawRecipe};

pub const SPOONACULAR_BASE_URL: &str = "https://api.spoonacular.com";

pub const SOURCE_NAME: &str = "spoonacular";

/// Bulk lookups are slow; give them room
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

const REQUEST_INTERVAL: Duration = Duration::from_millis(100);

/// Page size of the search call, also the bulk endpoint's id limit
const SEARCH_PAGE_SIZE: u32 = 100;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SpoonacularRecipe {
    pub id: Option<i64>,
    pub title: Option<String>,
    #[serde(default)]
    pub cuisines: Vec<String>,
    pub instructions: Option<String>,
    #[serde(default, rename = "analyzedInstructions")]
    pub analyzed_instructions: Vec<InstructionSection>,
    pub image: Option<String>,
    #[serde(default, rename = "extendedIngredients")]
    pub extended_ingredients: Vec<ExtendedIngredient>,
}

#[derive(Debug, Deserialize)]
pub struct InstructionSection {
    #[serde(default)]
    pub steps: Vec<InstructionStep>,
}

#[derive(Debug, Deserialize)]
pub struct InstructionStep {
    pub step: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ExtendedIngredient {
    #[serde(rename = "nameClean")]
    pub name_clean: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "originalName")]
    pub original_name: Option<String>,
    pub original: Option<String>,
    #[serde(default)]
    pub measures: Option<Measures>,
}

#[derive(Debug, Deserialize)]
pub struct Measures {
    pub metric: Option<Measure>,
    pub us: Option<Measure>,
}

#[derive(Debug, Deserialize)]
pub struct Measure {
    pub amount: Option<Value>,
    #[serde(rename = "unitShort")]
    pub unit_short: Option<String>,
    #[serde(rename = "unitLong")]
    pub unit_long: Option<String>,
}

pub struct SpoonacularClient {
    http: JsonClient,
    base_url: String,
    api_key: String,
    dish_types: Vec<String>,
}

impl SpoonacularClient {
    pub fn new(api_key: String, dish_types: Vec<String>) -> Result<Self, SourceError> {
        if api_key.trim().is_empty() {
            return Err(SourceError::Config("Spoonacular API key is empty".to_string()));
        }

        Ok(Self {
            http: JsonClient::new(DEFAULT_TIMEOUT, REQUEST_INTERVAL)?,
            base_url: SPOONACULAR_BASE_URL.to_string(),
            api_key,
            dish_types,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn search_ids(&self, dish_type: &str) -> Result<Vec<String>, SourceError> {
        let url = format!("{}/recipes/complexSearch", self.base_url);
        let response: SearchResponse = self
            .http
            .get_json(
                &url,
                &[
                    ("apiKey", self.api_key.clone()),
                    ("type", dish_type.to_string()),
                    ("instructionsRequired", "true".to_string()),
                    ("number", SEARCH_PAGE_SIZE.to_string()),
                ],
            )
            .await?;

        let mut seen = HashSet::new();
        Ok(response
            .results
            .into_iter()
            .filter_map(|r| r.id)
            .filter(|id| seen.insert(*id))
            .map(|id| id.to_string())
            .collect())
    }

    async fn fetch_bulk(&self, ids: &[String]) -> Result<Vec<SpoonacularRecipe>, SourceError> {
        let url = format!("{}/recipes/informationBulk", self.base_url);
        self.http
            .get_json(
                &url,
                &[("ids", ids.join(",")), ("apiKey", self.api_key.clone())],
            )
            .await
    }
}

#[async_trait]
impl RecipeSource for SpoonacularClient {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    fn categories(&self) -> &[String] {
        &self.dish_types
    }

    async fn fetch_category(&self, dish_type: &str) -> Result<Vec<RawRecipe>, SourceError> {
        let ids = self.search_ids(dish_type).await?;
        info!(source = SOURCE_NAME, dish_type, recipes = ids.len(), "Fetching bulk details");
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let details = self.fetch_bulk(&ids).await?;
        Ok(details
            .iter()
            .map(|detail| normalize_recipe(detail, dish_type))
            .collect())
    }
}

/// Map a bulk-information recipe to a raw recipe; the dish type becomes the category
pub fn normalize_recipe(recipe: &SpoonacularRecipe, dish_type: &str) -> RawRecipe {
    let ingredients = recipe
        .extended_ingredients
        .iter()
        .filter_map(|item| {
            let name = [&item.name_clean, &item.name, &item.original_name, &item.original]
                .into_iter()
                .flatten()
                .find(|n| !n.trim().is_empty())?;
            Some(IngredientEntry {
                ingredient: Some(name.clone()),
                measure: format_measure(item),
            })
        })
        .collect();

    let area = if recipe.cuisines.is_empty() {
        None
    } else {
        Some(recipe.cuisines.join(", "))
    };

    RawRecipe {
        source_name: Some(SOURCE_NAME.to_string()),
        source_id: recipe.id.map(|id| id.to_string()),
        name: recipe.title.clone(),
        category: title_case(dish_type),
        area,
        instructions: instruction_text(recipe),
        thumbnail: recipe.image.clone(),
        ingredients,
    }
}

/// Plain instructions, else the analyzed steps joined by newlines
fn instruction_text(recipe: &SpoonacularRecipe) -> Option<String> {
    if let Some(text) = recipe.instructions.as_ref().filter(|t| !t.trim().is_empty()) {
        return Some(text.clone());
    }

    let steps: Vec<&str> = recipe
        .analyzed_instructions
        .iter()
        .flat_map(|section| section.steps.iter())
        .filter_map(|step| step.step.as_deref())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    if steps.is_empty() {
        None
    } else {
        Some(steps.join("\n"))
    }
}

/// Metric measure first, then US, then the original ingredient line
fn format_measure(item: &ExtendedIngredient) -> Option<String> {
    if let Some(measures) = &item.measures {
        for measure in [&measures.metric, &measures.us].into_iter().flatten() {
            let Some(amount) = measure.amount.as_ref().and_then(format_amount) else {
                continue;
            };
            let unit = measure
                .unit_short
                .as_deref()
                .filter(|u| !u.is_empty())
                .or(measure.unit_long.as_deref().filter(|u| !u.is_empty()));
            return Some(match unit {
                Some(unit) => format!("{} {}", amount, unit),
                None => amount,
            });
        }
    }

    item.original.clone().or_else(|| item.original_name.clone())
}

/// Numbers without a trailing `.0`
fn format_amount(amount: &Value) -> Option<String> {
    match amount {
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => Some(format!("{}", f as i64)),
            Some(f) => Some(format!("{}", f)),
            None => Some(n.to_string()),
        },
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

fn title_case(value: &str) -> Option<String> {
    let words: Vec<String> = value
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect();

    if words.is_empty() {
        None
    } else {
        Some(words.join(" "))
    }
}
