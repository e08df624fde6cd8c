//! Quality check results and summaries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of one quality check
///
/// Values are never mutated after construction; a checker only appends them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityCheckResult {
    pub check_name: String,
    pub passed: bool,
    pub message: String,
    /// Observed value (ratio, count or violation count depending on the check)
    pub metric_value: Option<f64>,
    /// Limit the metric was compared against
    pub threshold: Option<f64>,
}

impl QualityCheckResult {
    pub fn new(
        check_name: impl Into<String>,
        passed: bool,
        message: impl Into<String>,
        metric_value: Option<f64>,
        threshold: Option<f64>,
    ) -> Self {
        Self {
            check_name: check_name.into(),
            passed,
            message: message.into(),
            metric_value,
            threshold,
        }
    }
}

/// Aggregate verdict over a sequence of check results
///
/// `passed_checks + failed_checks == total_checks` always holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualitySummary {
    pub total_checks: usize,
    pub passed_checks: usize,
    pub failed_checks: usize,
    /// `passed_checks / total_checks`, 0.0 when nothing was checked
    pub pass_rate: f64,
    pub evaluated_at: DateTime<Utc>,
    pub details: Vec<QualityCheckResult>,
}

impl QualitySummary {
    pub fn from_results(details: Vec<QualityCheckResult>) -> Self {
        let total_checks = details.len();
        let passed_checks = details.iter().filter(|r| r.passed).count();
        let pass_rate = if total_checks == 0 {
            0.0
        } else {
            passed_checks as f64 / total_checks as f64
        };

        Self {
            total_checks,
            passed_checks,
            failed_checks: total_checks - passed_checks,
            pass_rate,
            evaluated_at: Utc::now(),
            details,
        }
    }

    pub fn all_passed(&self) -> bool {
        self.failed_checks == 0
    }

    /// Gate acceptance: no failures, or a pass rate at least `min_pass_rate`
    pub fn meets(&self, min_pass_rate: f64) -> bool {
        self.all_passed() || self.pass_rate >= min_pass_rate
    }

    pub fn failed(&self) -> impl Iterator<Item = &QualityCheckResult> {
        self.details.iter().filter(|r| !r.passed)
    }

    /// One-line description of every failed check, for error messages
    pub fn describe_failures(&self) -> String {
        let failures: Vec<String> = self
            .failed()
            .map(|r| format!("{}: {}", r.check_name, r.message))
            .collect();

        format!(
            "{}/{} checks failed ({})",
            self.failed_checks,
            self.total_checks,
            failures.join("; ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(name: &str, passed: bool) -> QualityCheckResult {
        QualityCheckResult::new(name, passed, "msg", None, None)
    }

    #[test]
    fn test_summary_counts_add_up() {
        let summary = QualitySummary::from_results(vec![
            result("a", true),
            result("b", false),
            result("c", true),
            result("d", true),
        ]);

        assert_eq!(summary.total_checks, 4);
        assert_eq!(summary.passed_checks + summary.failed_checks, summary.total_checks);
        assert!((summary.pass_rate - 0.75).abs() < f64::EPSILON);
        assert!(!summary.all_passed());
        assert!(summary.meets(0.75));
        assert!(!summary.meets(1.0));
    }

    #[test]
    fn test_empty_summary_has_zero_rate_but_no_failures() {
        let summary = QualitySummary::from_results(Vec::new());
        assert_eq!(summary.pass_rate, 0.0);
        assert!(summary.meets(1.0));
    }

    #[test]
    fn test_describe_failures_lists_only_failed() {
        let summary = QualitySummary::from_results(vec![result("ok", true), result("bad", false)]);
        let text = summary.describe_failures();
        assert!(text.starts_with("1/2 checks failed"));
        assert!(text.contains("bad: msg"));
        assert!(!text.contains("ok:"));
    }
}
