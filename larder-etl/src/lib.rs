//! larder-etl library interface
//!
//! Recipe ETL pipeline: extraction from recipe APIs, quality gating,
//! normalization, staging, and incremental warehouse loads, with every run
//! recorded in `etl_runs`.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod quality;
pub mod services;
pub mod utils;
pub mod workflow;

pub use crate::error::{EtlError, EtlResult};
pub use crate::workflow::{Orchestrator, PipelineOptions, RunSummary};
