//! Extract phase
//!
//! Pulls every configured category from every source (through the raw
//! cache), then merges the results. Records keep their first occurrence per
//! natural key; records without a key are passed through for the quality
//! gate to judge.

use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;

use super::raw_cache::RawCache;
use super::recipe_source::RecipeSource;
use crate::error::EtlResult;
use crate::models::{NaturalKey, RawRecipe};

/// Merged extraction result
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractOutput {
    pub records: Vec<RawRecipe>,
    /// Records dropped because an earlier one had the same natural key
    pub duplicates: usize,
    /// Categories answered from the cache
    pub cache_hits: usize,
}

pub struct RecipeExtractor {
    sources: Vec<Arc<dyn RecipeSource>>,
    cache: Option<RawCache>,
    refresh: bool,
}

impl RecipeExtractor {
    pub fn new(sources: Vec<Arc<dyn RecipeSource>>) -> Self {
        Self {
            sources,
            cache: None,
            refresh: false,
        }
    }

    /// Read and write the raw cache; `refresh` skips reading it
    pub fn with_cache(mut self, cache: RawCache, refresh: bool) -> Self {
        self.cache = Some(cache);
        self.refresh = refresh;
        self
    }

    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    pub async fn extract(&self) -> EtlResult<ExtractOutput> {
        let mut output = ExtractOutput::default();
        let mut seen: HashSet<NaturalKey> = HashSet::new();

        for source in &self.sources {
            for category in source.categories() {
                let (records, cached) = self.fetch_category(source.as_ref(), category).await?;
                if cached {
                    output.cache_hits += 1;
                }
                info!(
                    source = source.name(),
                    category = %category,
                    records = records.len(),
                    cached,
                    "Extracted category"
                );

                for record in records {
                    let is_new = match record.natural_key() {
                        Some(key) => seen.insert(key),
                        None => true,
                    };
                    if is_new {
                        output.records.push(record);
                    } else {
                        output.duplicates += 1;
                    }
                }
            }
        }

        Ok(output)
    }

    async fn fetch_category(
        &self,
        source: &dyn RecipeSource,
        category: &str,
    ) -> EtlResult<(Vec<RawRecipe>, bool)> {
        if let (Some(cache), false) = (&self.cache, self.refresh) {
            if let Some(records) = cache.load(source.name(), category).await? {
                return Ok((records, true));
            }
        }

        let records = source.fetch_category(category).await?;

        if let Some(cache) = &self.cache {
            cache.store(source.name(), category, &records).await?;
        }
        Ok((records, false))
    }
}
