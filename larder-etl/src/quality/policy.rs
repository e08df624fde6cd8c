//! Quality policy
//!
//! Every rule of the composite recipe check has its own enabled flag and
//! threshold. The policy is read once per invocation from the `[quality]`
//! table of the TOML config; omitted keys keep their defaults.
//!
//! ```toml
//! [quality]
//! min_pass_rate = 1.0
//!
//! [quality.coverage]
//! min_ratio = 0.8
//!
//! [quality.category]
//! enabled = false
//! ```

use larder_common::{Error, Result};
use serde::{Deserialize, Serialize};

/// Batch size bounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordCountRule {
    pub enabled: bool,
    pub min: usize,
    pub max: Option<usize>,
}

impl Default for RecordCountRule {
    fn default() -> Self {
        Self {
            enabled: true,
            min: 1,
            max: None,
        }
    }
}

/// Columns that must be present on every record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequiredColumnsRule {
    pub enabled: bool,
    pub columns: Vec<String>,
    pub max_null_ratio: f64,
}

impl Default for RequiredColumnsRule {
    fn default() -> Self {
        Self {
            enabled: true,
            columns: ["recipe_nk", "source_name", "source_id", "name"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
            max_null_ratio: 0.0,
        }
    }
}

/// Natural key uniqueness
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UniqueRule {
    pub enabled: bool,
}

impl Default for UniqueRule {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Share of recipes with at least one named ingredient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoverageRule {
    pub enabled: bool,
    pub min_ratio: f64,
}

impl Default for CoverageRule {
    fn default() -> Self {
        Self {
            enabled: true,
            min_ratio: 0.8,
        }
    }
}

/// Tolerated share of recipes without a category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryRule {
    pub enabled: bool,
    pub max_null_ratio: f64,
}

impl Default for CategoryRule {
    fn default() -> Self {
        Self {
            enabled: true,
            max_null_ratio: 0.5,
        }
    }
}

/// Bounds on the number of ingredients per recipe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RangeRule {
    pub enabled: bool,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl Default for RangeRule {
    fn default() -> Self {
        Self {
            enabled: true,
            min: Some(0.0),
            max: Some(100.0),
        }
    }
}

/// Composite recipe quality policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityPolicy {
    /// Minimum summary pass rate for a gate to accept a batch
    pub min_pass_rate: f64,
    pub record_count: RecordCountRule,
    pub required: RequiredColumnsRule,
    pub unique_natural_key: UniqueRule,
    pub coverage: CoverageRule,
    pub category: CategoryRule,
    pub ingredient_count: RangeRule,
}

impl Default for QualityPolicy {
    fn default() -> Self {
        Self {
            min_pass_rate: 1.0,
            record_count: RecordCountRule::default(),
            required: RequiredColumnsRule::default(),
            unique_natural_key: UniqueRule::default(),
            coverage: CoverageRule::default(),
            category: CategoryRule::default(),
            ingredient_count: RangeRule::default(),
        }
    }
}

impl QualityPolicy {
    /// Build from the `[quality]` table of the TOML config
    pub fn from_table(table: &toml::Table) -> Result<Self> {
        let policy: QualityPolicy = toml::Value::Table(table.clone())
            .try_into()
            .map_err(|e| Error::Config(format!("Invalid [quality] section: {}", e)))?;
        policy.validate()?;
        Ok(policy)
    }

    pub fn validate(&self) -> Result<()> {
        let ratios = [
            ("min_pass_rate", self.min_pass_rate),
            ("required.max_null_ratio", self.required.max_null_ratio),
            ("coverage.min_ratio", self.coverage.min_ratio),
            ("category.max_null_ratio", self.category.max_null_ratio),
        ];
        for (name, value) in ratios {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::Config(format!(
                    "quality.{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }

        if let Some(max) = self.record_count.max {
            if max < self.record_count.min {
                return Err(Error::Config(format!(
                    "quality.record_count.max ({}) is below min ({})",
                    max, self.record_count.min
                )));
            }
        }

        if let (Some(min), Some(max)) = (self.ingredient_count.min, self.ingredient_count.max) {
            if max < min {
                return Err(Error::Config(format!(
                    "quality.ingredient_count.max ({}) is below min ({})",
                    max, min
                )));
            }
        }

        Ok(())
    }
}
