//! Column access over recipe records

use crate::models::{RawRecipe, Recipe};

/// Value of one column of one record, as seen by the quality checks
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Text(String),
    Number(f64),
    /// Collection column; carries the number of usable elements
    List(usize),
}

impl FieldValue {
    /// Blank text counts as missing
    pub fn is_null(&self) -> bool {
        match self {
            FieldValue::Null => true,
            FieldValue::Text(s) => s.trim().is_empty(),
            FieldValue::Number(n) => n.is_nan(),
            FieldValue::List(_) => false,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            FieldValue::Text(s) => s.trim().parse().ok(),
            FieldValue::List(n) => Some(*n as f64),
            FieldValue::Null => None,
        }
    }

    /// Identity used by the uniqueness check; `None` for missing values
    pub fn unique_key(&self) -> Option<String> {
        if self.is_null() {
            return None;
        }
        match self {
            FieldValue::Text(s) => Some(format!("t:{}", s)),
            FieldValue::Number(n) => Some(format!("n:{}", n)),
            FieldValue::List(n) => Some(format!("l:{}", n)),
            FieldValue::Null => None,
        }
    }
}

impl From<Option<&str>> for FieldValue {
    fn from(value: Option<&str>) -> Self {
        match value {
            Some(s) => FieldValue::Text(s.to_string()),
            None => FieldValue::Null,
        }
    }
}

/// A record with a fixed, named set of columns
pub trait Record {
    /// Every column `field` understands
    const COLUMNS: &'static [&'static str];

    /// Value for `column`; `Null` for columns outside `COLUMNS`
    fn field(&self, column: &str) -> FieldValue;

    fn has_column(column: &str) -> bool {
        Self::COLUMNS.contains(&column)
    }
}

const RECIPE_COLUMNS: &[&str] = &[
    "recipe_nk",
    "source_name",
    "source_id",
    "name",
    "category",
    "area",
    "instructions",
    "thumbnail",
    "ingredients",
    "ingredient_count",
];

impl Record for RawRecipe {
    const COLUMNS: &'static [&'static str] = RECIPE_COLUMNS;

    fn field(&self, column: &str) -> FieldValue {
        match column {
            "recipe_nk" => match self.natural_key() {
                Some(nk) => FieldValue::Text(nk.to_string()),
                None => FieldValue::Null,
            },
            "source_name" => self.source_name.as_deref().into(),
            "source_id" => self.source_id.as_deref().into(),
            "name" => self.name.as_deref().into(),
            "category" => self.category.as_deref().into(),
            "area" => self.area.as_deref().into(),
            "instructions" => self.instructions.as_deref().into(),
            "thumbnail" => self.thumbnail.as_deref().into(),
            "ingredients" => FieldValue::List(self.named_ingredient_count()),
            "ingredient_count" => FieldValue::Number(self.named_ingredient_count() as f64),
            _ => FieldValue::Null,
        }
    }
}

impl Record for Recipe {
    const COLUMNS: &'static [&'static str] = RECIPE_COLUMNS;

    fn field(&self, column: &str) -> FieldValue {
        match column {
            "recipe_nk" => FieldValue::Text(self.recipe_nk()),
            "source_name" => FieldValue::Text(self.source_name.clone()),
            "source_id" => FieldValue::Text(self.source_id.clone()),
            "name" => self.name.as_deref().into(),
            "category" => self.category.as_deref().into(),
            "area" => self.area.as_deref().into(),
            "instructions" => self.instructions.as_deref().into(),
            "thumbnail" => self.thumbnail.as_deref().into(),
            "ingredients" => FieldValue::List(self.ingredients.len()),
            "ingredient_count" => FieldValue::Number(self.ingredients.len() as f64),
            _ => FieldValue::Null,
        }
    }
}
