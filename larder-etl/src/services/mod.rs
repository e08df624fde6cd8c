//! Pipeline services
//!
//! Sources and extraction, normalization, snapshot and object storage,
//! run tracking and the incremental warehouse loader.

pub mod dimension_key;
pub mod extractor;
pub mod http;
pub mod incremental_loader;
pub mod normalizer;
pub mod object_store;
pub mod raw_cache;
pub mod recipe_source;
pub mod run_tracker;
pub mod snapshot_store;
pub mod spoonacular_client;
pub mod themealdb_client;
pub mod transformer;

pub use extractor::{ExtractOutput, RecipeExtractor};
pub use incremental_loader::{plan_load, IncrementalLoader, LoadPlan};
pub use object_store::{LocalObjectStore, ObjectStore};
pub use raw_cache::RawCache;
pub use recipe_source::{RecipeSource, SourceError};
pub use run_tracker::{RunContext, RunTracker};
pub use snapshot_store::SnapshotStore;
pub use spoonacular_client::SpoonacularClient;
pub use themealdb_client::TheMealDbClient;
pub use transformer::{transform_recipes, TransformOutput};
