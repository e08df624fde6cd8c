//! # Larder Common Library
//!
//! Shared code for the Larder recipe pipeline crates:
//! - Error type and result alias
//! - Configuration loading and root folder resolution
//! - SQLite initialization and the relational/warehouse schema
//! - Timestamp helpers

pub mod config;
pub mod db;
pub mod error;
pub mod time;

pub use error::{Error, Result};
