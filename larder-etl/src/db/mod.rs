//! Database access for larder-etl
//!
//! Schema lives in `larder_common::db`; these modules hold the queries.

pub mod runs;
pub mod staging;
pub mod warehouse;
