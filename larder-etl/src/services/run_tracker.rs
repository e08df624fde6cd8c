//! Run tracker
//!
//! Records the lifecycle of each pipeline execution in `etl_runs`. Rows are
//! created once, updated at phase boundaries and never deleted. A terminal
//! run (completed or failed) is never moved again.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::db::runs;
use crate::error::{EtlError, EtlResult};
use crate::models::{EtlPhase, EtlRun, PhaseUpdate, QualitySummary};
use crate::utils::db_retry::DEFAULT_MAX_LOCK_WAIT_MS;

/// Exclusive handle on one run
///
/// Neither `Clone` nor `Copy`. Phases borrow it from the code that started
/// the run.
#[derive(Debug)]
pub struct RunContext {
    run_id: Uuid,
    started_at: DateTime<Utc>,
    started: Instant,
}

impl RunContext {
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn elapsed(&self) -> std::time::Duration {
        self.started.elapsed()
    }
}

/// CRU operations on `etl_runs`
#[derive(Debug, Clone)]
pub struct RunTracker {
    db: SqlitePool,
    max_lock_wait_ms: u64,
}

impl RunTracker {
    pub fn new(db: SqlitePool) -> Self {
        Self {
            db,
            max_lock_wait_ms: DEFAULT_MAX_LOCK_WAIT_MS,
        }
    }

    /// Total time a write may spend retrying on a locked database
    pub fn with_max_lock_wait_ms(mut self, max_lock_wait_ms: u64) -> Self {
        self.max_lock_wait_ms = max_lock_wait_ms;
        self
    }

    /// Create a `running` row; extraction is considered started
    pub async fn start_run(&self) -> EtlResult<RunContext> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();

        runs::insert_run(&self.db, run_id, started_at, self.max_lock_wait_ms).await?;
        info!(run_id = %run_id, "Started ETL run");

        Ok(RunContext {
            run_id,
            started_at,
            started: Instant::now(),
        })
    }

    /// Update phase timestamps, counts and file path of a running run
    pub async fn record_phase(
        &self,
        run_id: Uuid,
        phase: EtlPhase,
        update: &PhaseUpdate,
    ) -> EtlResult<()> {
        let affected =
            runs::update_phase(&self.db, run_id, phase, update, self.max_lock_wait_ms).await?;
        if affected == 0 {
            return Err(self.rejected_transition(run_id).await);
        }

        debug!(
            run_id = %run_id,
            phase = %phase,
            record_count = ?update.record_count,
            skipped = ?update.skipped_count,
            "Recorded phase update"
        );
        Ok(())
    }

    /// `running -> completed` with the final quality summary
    pub async fn complete_run(&self, run_id: Uuid, summary: &QualitySummary) -> EtlResult<()> {
        let affected =
            runs::mark_completed(&self.db, run_id, Utc::now(), summary, self.max_lock_wait_ms)
                .await?;
        if affected == 0 {
            return Err(self.rejected_transition(run_id).await);
        }

        info!(
            run_id = %run_id,
            pass_rate = summary.pass_rate,
            "ETL run completed"
        );
        Ok(())
    }

    /// `running -> failed`
    ///
    /// Returns `false` without touching history when the run is already
    /// terminal.
    pub async fn fail_run(&self, run_id: Uuid, message: &str) -> EtlResult<bool> {
        let affected =
            runs::mark_failed(&self.db, run_id, Utc::now(), message, self.max_lock_wait_ms).await?;
        if affected == 1 {
            warn!(run_id = %run_id, error = message, "ETL run failed");
            return Ok(true);
        }

        match self.rejected_transition(run_id).await {
            EtlError::InvalidTransition { status, .. } => {
                debug!(run_id = %run_id, status = %status, "Run already terminal, fail ignored");
                Ok(false)
            }
            other => Err(other),
        }
    }

    pub async fn get_run(&self, run_id: Uuid) -> EtlResult<Option<EtlRun>> {
        Ok(runs::load_run(&self.db, run_id).await?)
    }

    /// Most recently started run, if any
    pub async fn get_latest_run_status(&self) -> EtlResult<Option<EtlRun>> {
        Ok(runs::list_runs(&self.db, 1).await?.into_iter().next())
    }

    pub async fn list_runs(&self, limit: u32) -> EtlResult<Vec<EtlRun>> {
        Ok(runs::list_runs(&self.db, limit).await?)
    }

    /// Fail runs left `running` for longer than `max_age`
    ///
    /// A crashed process never gets to call `fail_run`; this closes its run.
    pub async fn fail_stale_runs(&self, max_age: chrono::Duration) -> EtlResult<u64> {
        let now = Utc::now();
        let message = format!(
            "Run abandoned: still running after {} seconds",
            max_age.num_seconds()
        );

        // A cutoff before the earliest representable date means nothing is stale
        let Some(cutoff) = now.checked_sub_signed(max_age) else {
            debug!(max_age_secs = max_age.num_seconds(), "Stale cutoff out of range, skipping sweep");
            return Ok(0);
        };

        let failed =
            runs::mark_stale_failed(&self.db, cutoff, now, &message, self.max_lock_wait_ms)
                .await?;
        if failed > 0 {
            warn!(count = failed, "Marked stale runs as failed");
        }
        Ok(failed)
    }

    /// Explain why a conditional update matched no row
    async fn rejected_transition(&self, run_id: Uuid) -> EtlError {
        match runs::load_run(&self.db, run_id).await {
            Ok(Some(run)) if run.status.is_terminal() => EtlError::InvalidTransition {
                run_id,
                status: run.status,
            },
            Ok(Some(run)) => EtlError::Common(larder_common::Error::Internal(format!(
                "Run {} is {} but rejected the update",
                run_id, run.status
            ))),
            Ok(None) => EtlError::UnknownRun(run_id),
            Err(e) => EtlError::Common(e),
        }
    }
}
