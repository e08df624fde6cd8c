//! Database retry logic
//!
//! Retries SQLite writes that fail with "database is locked" using
//! exponential backoff, until `max_wait_ms` has elapsed. Overlapping runs
//! writing `etl_runs` and the warehouse tables are the usual source of
//! contention.

use larder_common::{Error, Result};
use std::time::{Duration, Instant};

/// First backoff delay
const INITIAL_BACKOFF_MS: u64 = 10;

/// Backoff ceiling
const MAX_BACKOFF_MS: u64 = 1000;

/// Default total retry budget for run tracking writes
pub const DEFAULT_MAX_LOCK_WAIT_MS: u64 = 5000;

/// Retry a database operation with exponential backoff until `max_wait_ms` elapses.
///
/// **Algorithm:**
/// 1. Attempt operation
/// 2. If successful, return result
/// 3. If "database is locked": back off and retry while time remains,
///    otherwise give up with `Error::Internal`
/// 4. Any other error is returned immediately
///
/// Backoff starts at 10ms and doubles up to 1000ms.
pub async fn retry_on_lock<F, Fut, T>(
    operation_name: &str,
    max_wait_ms: u64,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let start_time = Instant::now();
    let max_duration = Duration::from_millis(max_wait_ms);
    let mut attempt = 0u32;
    let mut backoff_ms = INITIAL_BACKOFF_MS;

    loop {
        attempt += 1;

        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::debug!(
                        operation = operation_name,
                        attempt,
                        elapsed_ms = start_time.elapsed().as_millis() as u64,
                        "Database operation succeeded after retry"
                    );
                }
                return Ok(result);
            }
            Err(err) => {
                if !is_lock_error(&err) {
                    return Err(err);
                }

                let elapsed = start_time.elapsed();
                if elapsed >= max_duration {
                    tracing::error!(
                        operation = operation_name,
                        attempt,
                        elapsed_ms = elapsed.as_millis() as u64,
                        max_wait_ms,
                        "Database operation failed: max retry time exceeded"
                    );
                    return Err(Error::Internal(format!(
                        "{}: database locked after {} attempts ({} ms elapsed, max {} ms)",
                        operation_name,
                        attempt,
                        elapsed.as_millis(),
                        max_wait_ms
                    )));
                }

                tracing::warn!(
                    operation = operation_name,
                    attempt,
                    backoff_ms,
                    remaining_ms = max_duration.saturating_sub(elapsed).as_millis() as u64,
                    "Database locked, will retry after backoff"
                );

                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                backoff_ms = (backoff_ms * 2).min(MAX_BACKOFF_MS);
            }
        }
    }
}

fn is_lock_error(err: &Error) -> bool {
    match err {
        Error::Database(db_err) => db_err.to_string().contains("database is locked"),
        _ => false,
    }
}
