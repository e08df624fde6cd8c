//! `etl_runs` persistence
//!
//! Writes go through `retry_on_lock`. State transitions are conditional on
//! `status = 'running'`; callers inspect the affected row count to tell a
//! missing run from a terminal one.

use chrono::{DateTime, Utc};
use larder_common::time::{from_db, from_db_opt, to_db};
use larder_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::models::{EtlPhase, EtlRun, PhaseUpdate, QualitySummary, RunStatus};
use crate::utils::retry_on_lock;

const RUN_COLUMNS: &str = r#"
    run_id, status, run_started_at,
    extract_started_at, extract_ended_at,
    transform_started_at, transform_ended_at,
    load_started_at, load_ended_at, ended_at,
    raw_record_count, processed_record_count, loaded_record_count, skipped_record_count,
    raw_file_path, processed_file_path, quality_summary, error_message
"#;

/// Insert a new `running` row; extraction starts with the run
pub async fn insert_run(
    pool: &SqlitePool,
    run_id: Uuid,
    started_at: DateTime<Utc>,
    max_wait_ms: u64,
) -> Result<()> {
    let run_id = run_id.to_string();
    let started_at = to_db(&started_at);

    retry_on_lock("insert_run", max_wait_ms, || async {
        sqlx::query(
            r#"
            INSERT INTO etl_runs (run_id, status, run_started_at, extract_started_at)
            VALUES (?, 'running', ?, ?)
            "#,
        )
        .bind(&run_id)
        .bind(&started_at)
        .bind(&started_at)
        .execute(pool)
        .await
        .map_err(Error::Database)?;

        Ok(())
    })
    .await
}

/// Apply a phase update to a running run; returns affected rows (0 or 1)
pub async fn update_phase(
    pool: &SqlitePool,
    run_id: Uuid,
    phase: EtlPhase,
    update: &PhaseUpdate,
    max_wait_ms: u64,
) -> Result<u64> {
    let mut assignments = vec![
        coalesce(phase.started_column()),
        coalesce(phase.ended_column()),
        coalesce(phase.count_column()),
        coalesce("skipped_record_count"),
    ];
    let file_column = phase.file_column();
    if let Some(column) = file_column {
        assignments.push(coalesce(column));
    }
    let sql = format!(
        "UPDATE etl_runs SET {} WHERE run_id = ? AND status = 'running'",
        assignments.join(", ")
    );

    let run_id = run_id.to_string();
    let started_at = update.started_at.as_ref().map(to_db);
    let ended_at = update.ended_at.as_ref().map(to_db);
    let record_count = update.record_count.map(|n| n as i64);
    let skipped_count = update.skipped_count.map(|n| n as i64);
    let file_path = file_column.and(update.file_path.clone());

    retry_on_lock("update_phase", max_wait_ms, || async {
        let mut query = sqlx::query(&sql)
            .bind(&started_at)
            .bind(&ended_at)
            .bind(record_count)
            .bind(skipped_count);
        if file_column.is_some() {
            query = query.bind(&file_path);
        }

        let result = query
            .bind(&run_id)
            .execute(pool)
            .await
            .map_err(Error::Database)?;

        Ok(result.rows_affected())
    })
    .await
}

fn coalesce(column: &str) -> String {
    format!("{column} = COALESCE(?, {column})")
}

/// `running -> completed`; returns affected rows
pub async fn mark_completed(
    pool: &SqlitePool,
    run_id: Uuid,
    ended_at: DateTime<Utc>,
    summary: &QualitySummary,
    max_wait_ms: u64,
) -> Result<u64> {
    let run_id = run_id.to_string();
    let ended_at = to_db(&ended_at);
    let summary = serde_json::to_string(summary)?;

    retry_on_lock("mark_completed", max_wait_ms, || async {
        let result = sqlx::query(
            r#"
            UPDATE etl_runs
            SET status = 'completed', ended_at = ?, quality_summary = ?
            WHERE run_id = ? AND status = 'running'
            "#,
        )
        .bind(&ended_at)
        .bind(&summary)
        .bind(&run_id)
        .execute(pool)
        .await
        .map_err(Error::Database)?;

        Ok(result.rows_affected())
    })
    .await
}

/// `running -> failed`; returns affected rows
pub async fn mark_failed(
    pool: &SqlitePool,
    run_id: Uuid,
    ended_at: DateTime<Utc>,
    message: &str,
    max_wait_ms: u64,
) -> Result<u64> {
    let run_id = run_id.to_string();
    let ended_at = to_db(&ended_at);

    retry_on_lock("mark_failed", max_wait_ms, || async {
        let result = sqlx::query(
            r#"
            UPDATE etl_runs
            SET status = 'failed', ended_at = ?, error_message = ?
            WHERE run_id = ? AND status = 'running'
            "#,
        )
        .bind(&ended_at)
        .bind(message)
        .bind(&run_id)
        .execute(pool)
        .await
        .map_err(Error::Database)?;

        Ok(result.rows_affected())
    })
    .await
}

/// Fail every run still `running` that started before `cutoff`
pub async fn mark_stale_failed(
    pool: &SqlitePool,
    cutoff: DateTime<Utc>,
    ended_at: DateTime<Utc>,
    message: &str,
    max_wait_ms: u64,
) -> Result<u64> {
    let cutoff = to_db(&cutoff);
    let ended_at = to_db(&ended_at);

    retry_on_lock("mark_stale_failed", max_wait_ms, || async {
        let result = sqlx::query(
            r#"
            UPDATE etl_runs
            SET status = 'failed', ended_at = ?, error_message = ?
            WHERE status = 'running' AND run_started_at < ?
            "#,
        )
        .bind(&ended_at)
        .bind(message)
        .bind(&cutoff)
        .execute(pool)
        .await
        .map_err(Error::Database)?;

        Ok(result.rows_affected())
    })
    .await
}

/// Load one run
pub async fn load_run(pool: &SqlitePool, run_id: Uuid) -> Result<Option<EtlRun>> {
    let sql = format!("SELECT {} FROM etl_runs WHERE run_id = ?", RUN_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(run_id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(run_from_row).transpose()
}

/// Most recently started runs first
pub async fn list_runs(pool: &SqlitePool, limit: u32) -> Result<Vec<EtlRun>> {
    let sql = format!(
        "SELECT {} FROM etl_runs ORDER BY run_started_at DESC, rowid DESC LIMIT ?",
        RUN_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(i64::from(limit))
        .fetch_all(pool)
        .await?;

    rows.iter().map(run_from_row).collect()
}

fn run_from_row(row: &SqliteRow) -> Result<EtlRun> {
    let run_id: String = row.try_get("run_id")?;
    let run_id = Uuid::parse_str(&run_id)
        .map_err(|e| Error::Internal(format!("Invalid run_id '{}': {}", run_id, e)))?;

    let status: String = row.try_get("status")?;
    let status: RunStatus = status.parse().map_err(Error::Internal)?;

    let run_started_at: String = row.try_get("run_started_at")?;

    let quality_summary: Option<String> = row.try_get("quality_summary")?;
    let quality_summary = quality_summary
        .map(|json| serde_json::from_str::<QualitySummary>(&json))
        .transpose()?;

    let count = |column: &str| -> Result<Option<u64>> {
        Ok(row.try_get::<Option<i64>, _>(column)?.map(|n| n as u64))
    };
    let timestamp =
        |column: &str| -> Result<Option<DateTime<Utc>>> { from_db_opt(row.try_get(column)?) };

    Ok(EtlRun {
        run_id,
        status,
        run_started_at: from_db(&run_started_at)?,
        extract_started_at: timestamp("extract_started_at")?,
        extract_ended_at: timestamp("extract_ended_at")?,
        transform_started_at: timestamp("transform_started_at")?,
        transform_ended_at: timestamp("transform_ended_at")?,
        load_started_at: timestamp("load_started_at")?,
        load_ended_at: timestamp("load_ended_at")?,
        ended_at: timestamp("ended_at")?,
        raw_record_count: count("raw_record_count")?,
        processed_record_count: count("processed_record_count")?,
        loaded_record_count: count("loaded_record_count")?,
        skipped_record_count: count("skipped_record_count")?,
        raw_file_path: row.try_get("raw_file_path")?,
        processed_file_path: row.try_get("processed_file_path")?,
        quality_summary,
        error_message: row.try_get("error_message")?,
    })
}
