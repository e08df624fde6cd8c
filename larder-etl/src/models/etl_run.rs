//! ETL run lifecycle
//!
//! A run starts `running` and ends in exactly one terminal state:
//! RUNNING → COMPLETED or RUNNING → FAILED. Terminal states are never left.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::QualitySummary;

/// Run status as stored in `etl_runs.status`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Failed)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(RunStatus::Running),
            "completed" => Ok(RunStatus::Completed),
            "failed" => Ok(RunStatus::Failed),
            other => Err(format!("unknown run status '{}'", other)),
        }
    }
}

/// Pipeline phase with its own timestamps on the run record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EtlPhase {
    Extract,
    Transform,
    Load,
}

impl EtlPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            EtlPhase::Extract => "extract",
            EtlPhase::Transform => "transform",
            EtlPhase::Load => "load",
        }
    }

    pub(crate) fn started_column(&self) -> &'static str {
        match self {
            EtlPhase::Extract => "extract_started_at",
            EtlPhase::Transform => "transform_started_at",
            EtlPhase::Load => "load_started_at",
        }
    }

    pub(crate) fn ended_column(&self) -> &'static str {
        match self {
            EtlPhase::Extract => "extract_ended_at",
            EtlPhase::Transform => "transform_ended_at",
            EtlPhase::Load => "load_ended_at",
        }
    }

    pub(crate) fn count_column(&self) -> &'static str {
        match self {
            EtlPhase::Extract => "raw_record_count",
            EtlPhase::Transform => "processed_record_count",
            EtlPhase::Load => "loaded_record_count",
        }
    }

    /// Load writes to tables, not to a snapshot file
    pub(crate) fn file_column(&self) -> Option<&'static str> {
        match self {
            EtlPhase::Extract => Some("raw_file_path"),
            EtlPhase::Transform => Some("processed_file_path"),
            EtlPhase::Load => None,
        }
    }
}

impl fmt::Display for EtlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Partial update applied at a phase boundary
///
/// Unset fields leave the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhaseUpdate {
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub record_count: Option<u64>,
    pub file_path: Option<String>,
    pub skipped_count: Option<u64>,
}

impl PhaseUpdate {
    pub fn started(at: DateTime<Utc>) -> Self {
        Self {
            started_at: Some(at),
            ..Default::default()
        }
    }

    pub fn ended(at: DateTime<Utc>) -> Self {
        Self {
            ended_at: Some(at),
            ..Default::default()
        }
    }

    pub fn with_record_count(mut self, count: usize) -> Self {
        self.record_count = Some(count as u64);
        self
    }

    pub fn with_file_path(mut self, path: impl Into<String>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    pub fn with_skipped_count(mut self, count: usize) -> Self {
        self.skipped_count = Some(count as u64);
        self
    }
}

/// One row of `etl_runs`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EtlRun {
    pub run_id: Uuid,
    pub status: RunStatus,
    pub run_started_at: DateTime<Utc>,
    pub extract_started_at: Option<DateTime<Utc>>,
    pub extract_ended_at: Option<DateTime<Utc>>,
    pub transform_started_at: Option<DateTime<Utc>>,
    pub transform_ended_at: Option<DateTime<Utc>>,
    pub load_started_at: Option<DateTime<Utc>>,
    pub load_ended_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub raw_record_count: Option<u64>,
    pub processed_record_count: Option<u64>,
    pub loaded_record_count: Option<u64>,
    pub skipped_record_count: Option<u64>,
    pub raw_file_path: Option<String>,
    pub processed_file_path: Option<String>,
    pub quality_summary: Option<QualitySummary>,
    pub error_message: Option<String>,
}

impl EtlRun {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Wall-clock duration, if the run has ended
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.ended_at.map(|end| end - self.run_started_at)
    }
}
