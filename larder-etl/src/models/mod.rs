//! Data models for the recipe pipeline

pub mod etl_run;
pub mod quality;
pub mod recipe;
pub mod warehouse;

pub use etl_run::{EtlPhase, EtlRun, PhaseUpdate, RunStatus};
pub use quality::{QualityCheckResult, QualitySummary};
pub use recipe::{Ingredient, IngredientEntry, NaturalKey, RawRecipe, Recipe};
pub use warehouse::{
    DimensionKey, DimensionLookups, FactKey, FactRow, LoadOutcome, StagedFact, StagedRecipe,
};
