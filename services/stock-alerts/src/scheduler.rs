//! Cron-driven background tasks.

use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use cron::Schedule;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Parses a six-field cron expression (seconds first).
pub fn parse_schedule(expr: &str) -> Result<Schedule> {
    expr.parse::<Schedule>()
        .with_context(|| format!("Invalid cron expression '{}'", expr))
}

/// Runs `task` on every tick of `schedule` until `cancel` fires.
///
/// A failed run is logged and the next tick still fires. A run in progress
/// is allowed to finish before the loop observes cancellation.
pub fn spawn_cron<F, Fut>(name: &'static str, schedule: Schedule, cancel: CancellationToken, task: F) -> JoinHandle<()>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    tokio::spawn(async move {
        tracing::info!(task = name, "Scheduled task started");

        loop {
            let now = Utc::now();
            let next = match schedule.upcoming(Utc).next() {
                Some(next) => next,
                None => {
                    tracing::warn!(task = name, "No more upcoming cron executions");
                    break;
                }
            };
            let until = (next - now).to_std().unwrap_or(Duration::from_secs(1));

            tokio::select! {
                _ = tokio::time::sleep(until) => {
                    tracing::debug!(task = name, "Executing cron task");
                    if let Err(e) = task().await {
                        tracing::error!(task = name, error = %e, "Scheduled task failed");
                    }
                }
                _ = cancel.cancelled() => break,
            }
        }

        tracing::info!(task = name, "Scheduled task stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_parse_schedule() {
        assert!(parse_schedule("0 */15 * * * *").is_ok());
        assert!(parse_schedule("0 0 2 * * *").is_ok());

        let err = parse_schedule("every five minutes").unwrap_err();
        assert!(err.to_string().contains("every five minutes"));
    }

    #[tokio::test]
    async fn test_failing_task_keeps_running_until_cancelled() {
        let runs = Arc::new(AtomicUsize::new(0));
        let cancel = CancellationToken::new();

        let counter = runs.clone();
        let handle = spawn_cron("flaky", parse_schedule("* * * * * *").unwrap(), cancel.clone(), move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(anyhow!("database unavailable"))
            }
        });

        tokio::time::timeout(Duration::from_secs(10), async {
            while runs.load(Ordering::SeqCst) < 2 {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        })
        .await
        .expect("task should run twice despite failing");

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("task should stop after cancellation")
            .unwrap();
    }
}
