//! Quality checker
//!
//! Each `check_*` call evaluates one rule, appends the immutable result to the
//! checker's sequence and returns a copy of it.

use std::collections::HashMap;
use tracing::{info, warn};

use super::policy::QualityPolicy;
use super::record::Record;
use crate::error::{EtlError, EtlResult};
use crate::models::{QualityCheckResult, QualitySummary};

/// Append-only sequence of quality check results
#[derive(Debug)]
pub struct QualityChecker {
    results: Vec<QualityCheckResult>,
    raise_on_failure: bool,
    min_pass_rate: f64,
}

impl Default for QualityChecker {
    fn default() -> Self {
        Self {
            results: Vec::new(),
            raise_on_failure: false,
            min_pass_rate: 1.0,
        }
    }
}

impl QualityChecker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `verdict` return an error when the summary is not acceptable
    pub fn with_raise_on_failure(mut self, raise: bool) -> Self {
        self.raise_on_failure = raise;
        self
    }

    /// Pass rate `verdict` accepts despite failed checks (default 1.0)
    pub fn with_min_pass_rate(mut self, min_pass_rate: f64) -> Self {
        self.min_pass_rate = min_pass_rate;
        self
    }

    /// True when the summary so far meets the minimum pass rate
    pub fn is_acceptable(&self) -> bool {
        self.summary().meets(self.min_pass_rate)
    }

    fn record(&mut self, result: QualityCheckResult) -> QualityCheckResult {
        self.results.push(result.clone());
        result
    }

    /// Fraction of missing values must not exceed `max_null_ratio`
    ///
    /// An empty batch fails: there is nothing to vouch for.
    pub fn check_not_null<R: Record>(
        &mut self,
        batch: &[R],
        column: &str,
        max_null_ratio: f64,
    ) -> QualityCheckResult {
        let check_name = format!("not_null_{}", column);

        if !R::has_column(column) {
            return self.record(missing_column(check_name, column, Some(max_null_ratio)));
        }

        if batch.is_empty() {
            return self.record(QualityCheckResult::new(
                check_name,
                false,
                format!("Empty batch: no values to check in column '{}'", column),
                None,
                Some(max_null_ratio),
            ));
        }

        let nulls = batch.iter().filter(|r| r.field(column).is_null()).count();
        let ratio = nulls as f64 / batch.len() as f64;
        let passed = ratio <= max_null_ratio;

        self.record(QualityCheckResult::new(
            check_name,
            passed,
            format!(
                "Column '{}' has {:.2}% nulls ({} of {}, threshold {:.2}%)",
                column,
                ratio * 100.0,
                nulls,
                batch.len(),
                max_null_ratio * 100.0
            ),
            Some(ratio),
            Some(max_null_ratio),
        ))
    }

    /// No two non-null values of `column` may be equal
    pub fn check_unique<R: Record>(&mut self, batch: &[R], column: &str) -> QualityCheckResult {
        let check_name = format!("unique_{}", column);

        if !R::has_column(column) {
            return self.record(missing_column(check_name, column, Some(0.0)));
        }

        let mut seen: HashMap<String, usize> = HashMap::new();
        for record in batch {
            if let Some(key) = record.field(column).unique_key() {
                *seen.entry(key).or_insert(0) += 1;
            }
        }
        let duplicates: usize = seen.values().map(|n| n - 1).sum();

        let message = if duplicates == 0 {
            format!("Column '{}' values are unique", column)
        } else {
            format!("Column '{}' has {} duplicate values", column, duplicates)
        };

        self.record(QualityCheckResult::new(
            check_name,
            duplicates == 0,
            message,
            Some(duplicates as f64),
            Some(0.0),
        ))
    }

    /// Every non-null value must be numeric and within `[min, max]`
    ///
    /// Either bound may be omitted. A batch whose values are all null passes.
    pub fn check_value_range<R: Record>(
        &mut self,
        batch: &[R],
        column: &str,
        min: Option<f64>,
        max: Option<f64>,
    ) -> QualityCheckResult {
        let check_name = format!("range_{}", column);

        if !R::has_column(column) {
            return self.record(missing_column(check_name, column, None));
        }

        let mut checked = 0usize;
        let mut violations = 0usize;
        for record in batch {
            let value = record.field(column);
            if value.is_null() {
                continue;
            }
            checked += 1;
            let in_range = match value.as_number() {
                Some(n) => min.map_or(true, |lo| n >= lo) && max.map_or(true, |hi| n <= hi),
                None => false,
            };
            if !in_range {
                violations += 1;
            }
        }

        let bounds = format!(
            "[{}, {}]",
            min.map_or("-inf".to_string(), |v| v.to_string()),
            max.map_or("inf".to_string(), |v| v.to_string())
        );
        let message = if violations == 0 {
            format!("All {} values of '{}' within {}", checked, column, bounds)
        } else {
            format!(
                "{} of {} values of '{}' outside {}",
                violations, checked, column, bounds
            )
        };

        self.record(QualityCheckResult::new(
            check_name,
            violations == 0,
            message,
            Some(violations as f64),
            Some(0.0),
        ))
    }

    /// Batch size must be within `[min_count, max_count]`
    pub fn check_record_count<R: Record>(
        &mut self,
        batch: &[R],
        min_count: usize,
        max_count: Option<usize>,
    ) -> QualityCheckResult {
        let count = batch.len();

        let (passed, message) = if count < min_count {
            (
                false,
                format!("Record count {} below minimum {}", count, min_count),
            )
        } else if let Some(max) = max_count.filter(|max| count > *max) {
            (
                false,
                format!("Record count {} above maximum {}", count, max),
            )
        } else {
            (true, format!("Record count {} within bounds", count))
        };

        self.record(QualityCheckResult::new(
            "record_count",
            passed,
            message,
            Some(count as f64),
            Some(min_count as f64),
        ))
    }

    /// Share of records whose collection `column` is non-empty must reach `min_ratio`
    pub fn check_coverage<R: Record>(
        &mut self,
        batch: &[R],
        column: &str,
        min_ratio: f64,
    ) -> QualityCheckResult {
        let check_name = format!("coverage_{}", column);

        if !R::has_column(column) {
            return self.record(missing_column(check_name, column, Some(min_ratio)));
        }

        if batch.is_empty() {
            return self.record(QualityCheckResult::new(
                check_name,
                false,
                format!("Empty batch: no records to measure '{}' coverage", column),
                None,
                Some(min_ratio),
            ));
        }

        let covered = batch
            .iter()
            .filter(|r| matches!(r.field(column), super::FieldValue::List(n) if n > 0))
            .count();
        let ratio = covered as f64 / batch.len() as f64;

        self.record(QualityCheckResult::new(
            check_name,
            ratio >= min_ratio,
            format!(
                "{:.2}% of records have at least one '{}' entry (minimum {:.2}%)",
                ratio * 100.0,
                column,
                min_ratio * 100.0
            ),
            Some(ratio),
            Some(min_ratio),
        ))
    }

    /// Run every enabled rule of `policy` and summarize this checker
    pub fn check_recipe_data_quality<R: Record>(
        &mut self,
        batch: &[R],
        policy: &QualityPolicy,
    ) -> QualitySummary {
        if policy.record_count.enabled {
            self.check_record_count(batch, policy.record_count.min, policy.record_count.max);
        }

        if policy.required.enabled {
            for column in &policy.required.columns {
                self.check_not_null(batch, column, policy.required.max_null_ratio);
            }
        }

        if policy.unique_natural_key.enabled {
            self.check_unique(batch, "recipe_nk");
        }

        if policy.coverage.enabled {
            self.check_coverage(batch, "ingredients", policy.coverage.min_ratio);
        }

        if policy.category.enabled {
            self.check_not_null(batch, "category", policy.category.max_null_ratio);
        }

        if policy.ingredient_count.enabled {
            self.check_value_range(
                batch,
                "ingredient_count",
                policy.ingredient_count.min,
                policy.ingredient_count.max,
            );
        }

        self.summary()
    }

    pub fn results(&self) -> &[QualityCheckResult] {
        &self.results
    }

    pub fn summary(&self) -> QualitySummary {
        QualitySummary::from_results(self.results.clone())
    }

    pub fn failed_checks(&self) -> Vec<&QualityCheckResult> {
        self.results.iter().filter(|r| !r.passed).collect()
    }

    /// Log the summary, then one line per failed check
    pub fn log_summary(&self, stage: &str) {
        let summary = self.summary();
        info!(
            stage,
            total = summary.total_checks,
            passed = summary.passed_checks,
            failed = summary.failed_checks,
            pass_rate = summary.pass_rate,
            "Quality summary"
        );

        for result in self.results.iter().filter(|r| r.passed) {
            tracing::debug!(stage, check = %result.check_name, "{}", result.message);
        }

        for result in self.failed_checks() {
            let shortfall = match (result.metric_value, result.threshold) {
                (Some(actual), Some(expected)) => Some((actual - expected).abs()),
                _ => None,
            };
            warn!(
                stage,
                check = %result.check_name,
                expected = ?result.threshold,
                actual = ?result.metric_value,
                shortfall = ?shortfall,
                "{}",
                result.message
            );
        }
    }

    /// Summary, or `QualityGate` when raising is enabled and the summary
    /// falls short of the minimum pass rate
    pub fn verdict(&self, stage: &str) -> EtlResult<QualitySummary> {
        let summary = self.summary();
        if self.raise_on_failure && !summary.meets(self.min_pass_rate) {
            return Err(EtlError::QualityGate {
                stage: stage.to_string(),
                details: summary.describe_failures(),
            });
        }
        Ok(summary)
    }
}

fn missing_column(check_name: String, column: &str, threshold: Option<f64>) -> QualityCheckResult {
    QualityCheckResult::new(
        check_name,
        false,
        format!("Column '{}' does not exist", column),
        None,
        threshold,
    )
}
