//! Surrogate keys for warehouse dimensions
//!
//! A key is the SHA-256 hex digest of the natural attributes. Each attribute
//! is length-prefixed before hashing, so `("ab", "c")` and `("a", "bc")`
//! never collide.

use sha2::{Digest, Sha256};

use crate::models::{DimensionKey, NaturalKey};

/// Hash an ordered list of natural attributes
pub fn dimension_key(attributes: &[&str]) -> DimensionKey {
    let mut hasher = Sha256::new();
    for attribute in attributes {
        hasher.update((attribute.len() as u64).to_be_bytes());
        hasher.update(attribute.as_bytes());
    }
    DimensionKey::new(format!("{:x}", hasher.finalize()))
}

pub fn recipe_key(natural_key: &NaturalKey) -> DimensionKey {
    dimension_key(&[natural_key.source_name.as_str(), natural_key.source_id.as_str()])
}

pub fn ingredient_key(ingredient_name: &str) -> DimensionKey {
    dimension_key(&[ingredient_name])
}
