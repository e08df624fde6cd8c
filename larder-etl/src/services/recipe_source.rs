//! Upstream recipe sources
//!
//! A source returns raw recipe records for one category. Transport details
//! (pagination, detail lookups, pacing, retries) stay inside the
//! implementation.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::models::RawRecipe;

/// Upstream extraction errors
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Rate limit exceeded after {0} attempts")]
    RateLimitExceeded(u32),

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Extraction timed out after {0:?}")]
    Timeout(Duration),

    #[error("Source configuration error: {0}")]
    Config(String),
}

/// A recipe API queried category by category
#[async_trait]
pub trait RecipeSource: Send + Sync {
    /// Stable source slug, also used as `source_name`
    fn name(&self) -> &str;

    /// Categories (or dish types) this source is asked for
    fn categories(&self) -> &[String];

    async fn fetch_category(&self, category: &str) -> Result<Vec<RawRecipe>, SourceError>;
}
