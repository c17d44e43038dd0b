//! Bounded concurrent execution of per-object tasks.

use std::future::Future;

use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use crate::error::Error;

/// Drives `tasks` with at most `limit` in flight and joins them all.
///
/// A task resolves to `Ok(true)` on success, `Ok(false)` for a failure
/// it already reported, or `Err` for one it did not; errors are logged
/// here and counted as failures. Outcomes are inspected only after
/// every task has completed, so one failure never cancels siblings and
/// partial successes stay applied.
pub(crate) async fn run_all<F>(
    operation: &'static str,
    limit: usize,
    tasks: Vec<F>,
) -> Result<usize, Error>
where
    F: Future<Output = Result<bool, Error>>,
{
    let total = tasks.len();
    let outcomes = stream::iter(tasks)
        .buffer_unordered(limit.max(1))
        .collect::<Vec<_>>()
        .await;
    let mut failed = 0usize;
    for outcome in outcomes {
        match outcome {
            Ok(true) => {}
            Ok(false) => failed += 1,
            Err(e) => {
                warn!(operation, error = %e, "task failed");
                failed += 1;
            }
        }
    }
    if failed > 0 {
        return Err(Error::Tasks { operation, failed, total });
    }
    info!(operation, total, "all tasks completed");
    Ok(total)
}
