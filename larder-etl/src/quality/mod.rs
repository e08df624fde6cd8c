//! Data quality checks
//!
//! Checks are pure functions over a record batch; a `QualityChecker` appends
//! each result to its own sequence and summarizes them. Nothing here performs
//! I/O, and a failing check is a result, not an error.

pub mod checker;
pub mod policy;
pub mod record;

pub use checker::QualityChecker;
pub use policy::{
    CategoryRule, CoverageRule, QualityPolicy, RangeRule, RecordCountRule, RequiredColumnsRule,
    UniqueRule,
};
pub use record::{FieldValue, Record};
