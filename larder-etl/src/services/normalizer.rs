//! Ingredient and measure normalization
//!
//! Sources spell the same ingredient many ways ("Eggs", "4 large eggs",
//! "3 oz of eggs"). Normalized names are lowercase, free of punctuation and
//! leading quantities, and singular for the common plurals below.

use once_cell::sync::Lazy;
use regex::Regex;

/// Plural forms folded onto their singular
const PLURALS: &[(&str, &str)] = &[
    ("eggs", "egg"),
    ("tomatoes", "tomato"),
    ("potatoes", "potato"),
    ("chilies", "chili"),
    ("berries", "berry"),
    ("avocados", "avocado"),
    ("coconuts", "coconut"),
    ("cucumbers", "cucumber"),
    ("leeks", "leek"),
    ("onions", "onion"),
    ("pineapples", "pineapple"),
    ("pumpkins", "pumpkin"),
    ("radishes", "radish"),
    ("strawberries", "strawberry"),
    ("bananas", "banana"),
    ("apples", "apple"),
    ("oranges", "orange"),
    ("pears", "pear"),
    ("plums", "plum"),
    ("cherries", "cherry"),
    ("grapes", "grape"),
    ("melons", "melon"),
    ("nectarines", "nectarine"),
];

/// Values sources use to mean "no ingredient"
const PLACEHOLDER_NAMES: &[&str] = &["n/a", "na", "none", "null", "unknown"];

/// Anything that is neither a word character nor whitespace
static PUNCTUATION_RE: Lazy<Regex> = Lazy::new(|| compile(r"[^\w\s]"));

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| compile(r"\s+"));

/// Measurements merged into the front of a name, tried in order:
/// - `3 oz of pearl tapioca`, `3oz of butter`
/// - `4 large onions`
/// - `1.5 cups flour`
static QUANTITY_PREFIX_RE: Lazy<Regex> = Lazy::new(|| {
    compile(
        &[
            r"^\d+\s*[a-zA-Z]*\s+of\s+",
            r"^\d+\s+[a-zA-Z]+\s+",
            r"^\d+[\./]?\d*\s+[a-zA-Z]+\s+",
        ]
        .join("|"),
    )
});

/// Panics on an invalid pattern; every pattern above is a literal
fn compile(pattern: &str) -> Regex {
    match Regex::new(pattern) {
        Ok(re) => re,
        Err(e) => panic!("invalid normalizer pattern {}: {}", pattern, e),
    }
}

/// Normalize an ingredient name; `None` when nothing usable remains
pub fn normalize_ingredient_name(name: &str) -> Option<String> {
    let lowered = name.trim().to_lowercase();
    let cleaned = PUNCTUATION_RE.replace_all(&lowered, "");
    let collapsed = WHITESPACE_RE.replace_all(cleaned.trim(), " ");
    let stripped = QUANTITY_PREFIX_RE.replace(&collapsed, "");
    let stripped = stripped.trim();

    let singular = PLURALS
        .iter()
        .find(|(plural, _)| *plural == stripped)
        .map(|(_, single)| *single)
        .unwrap_or(stripped);

    if singular.chars().count() < 2 || PLACEHOLDER_NAMES.contains(&singular) {
        return None;
    }

    Some(singular.to_string())
}

/// Normalize a measure; `None` for blanks and "to taste"
pub fn normalize_measure(measure: &str) -> Option<String> {
    let lowered = measure.trim().to_lowercase();
    let stripped = lowered.replace("to taste", "");
    let stripped = stripped.trim();

    match stripped {
        "" | "n/a" | "null" => None,
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercases_and_strips_punctuation() {
        assert_eq!(normalize_ingredient_name("  Brown Sugar! ").as_deref(), Some("brown sugar"));
        assert_eq!(normalize_ingredient_name("Self-raising  flour").as_deref(), Some("selfraising flour"));
    }

    #[test]
    fn test_removes_quantity_prefixes() {
        assert_eq!(normalize_ingredient_name("3 oz of pearl tapioca").as_deref(), Some("pearl tapioca"));
        assert_eq!(normalize_ingredient_name("3oz of butter").as_deref(), Some("butter"));
        assert_eq!(normalize_ingredient_name("4 large onions").as_deref(), Some("onion"));
        assert_eq!(normalize_ingredient_name("2 cups rice").as_deref(), Some("rice"));
    }

    #[test]
    fn test_prefix_needs_a_following_name() {
        assert_eq!(normalize_ingredient_name("2 eggs").as_deref(), Some("2 eggs"));
        assert_eq!(normalize_ingredient_name("3 oz of").as_deref(), Some("of"));
    }

    #[test]
    fn test_decimal_quantity_prefix() {
        assert_eq!(normalize_ingredient_name("1.5 cups flour").as_deref(), Some("flour"));
        assert_eq!(normalize_ingredient_name("250 g  caster sugar").as_deref(), Some("caster sugar"));
    }

    #[test]
    fn test_singularizes_known_plurals() {
        assert_eq!(normalize_ingredient_name("Eggs").as_deref(), Some("egg"));
        assert_eq!(normalize_ingredient_name("Strawberries").as_deref(), Some("strawberry"));
        assert_eq!(normalize_ingredient_name("peas").as_deref(), Some("peas"));
    }

    #[test]
    fn test_rejects_placeholders_and_short_names() {
        assert!(normalize_ingredient_name("").is_none());
        assert!(normalize_ingredient_name("x").is_none());
        assert!(normalize_ingredient_name("N/A").is_none());
        assert!(normalize_ingredient_name("None").is_none());
        assert!(normalize_ingredient_name("!!").is_none());
    }

    #[test]
    fn test_measure_normalization() {
        assert_eq!(normalize_measure(" 1 Cup ").as_deref(), Some("1 cup"));
        assert_eq!(normalize_measure("Salt to taste").as_deref(), Some("salt"));
        assert!(normalize_measure("To taste").is_none());
        assert!(normalize_measure("  ").is_none());
        assert!(normalize_measure("NULL").is_none());
    }
}
