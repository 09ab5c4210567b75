//! Sequential batch execution with per-item failure accounting.
//!
//! Batch tools run their items strictly one after another with a fixed pause
//! between items. An item's failure is recorded and the batch moves on; the
//! report at the end carries every outcome plus the success/failure tally.

use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use crate::error::Error;

/// Outcome of one batch item.
#[derive(Debug, Clone, Serialize)]
pub struct ItemOutcome<T> {
    /// Position of the item in the submitted list.
    pub index: usize,
    /// Result payload when the item succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<T>,
    /// Error message when the item failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Report for a completed batch.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport<T> {
    /// Number of items that succeeded.
    pub succeeded: usize,
    /// Number of items that failed.
    pub failed: usize,
    /// Per-item outcomes, in submission order.
    pub items: Vec<ItemOutcome<T>>,
}

impl<T> BatchReport<T> {
    /// Total number of items processed.
    pub fn total(&self) -> usize {
        self.items.len()
    }
}

/// Run `op` over `items` strictly sequentially, pausing `delay` between
/// items. Failures are recorded and do not stop the batch.
pub async fn run_sequential<I, T, F, Fut>(
    items: Vec<I>,
    delay: Duration,
    mut op: F,
) -> BatchReport<T>
where
    F: FnMut(I) -> Fut,
    Fut: Future<Output = Result<T, Error>>,
{
    let total = items.len();
    let mut report = BatchReport {
        succeeded: 0,
        failed: 0,
        items: Vec::with_capacity(total),
    };

    for (index, item) in items.into_iter().enumerate() {
        if index > 0 {
            tokio::time::sleep(delay).await;
        }

        match op(item).await {
            Ok(output) => {
                report.succeeded += 1;
                report.items.push(ItemOutcome {
                    index,
                    output: Some(output),
                    error: None,
                });
            }
            Err(e) => {
                warn!(index, error = %e, "batch item failed, continuing");
                report.failed += 1;
                report.items.push(ItemOutcome {
                    index,
                    output: None,
                    error: Some(e.to_string()),
                });
            }
        }
    }

    info!(total, succeeded = report.succeeded, failed = report.failed, "batch finished");
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn continues_past_failures_and_counts_accurately() {
        let report = run_sequential(vec![1u32, 2, 3, 4, 5], Duration::from_millis(500), |n| async move {
            if n % 2 == 0 {
                Err(Error::tool(format!("item {n} exploded")))
            } else {
                Ok(n * 10)
            }
        })
        .await;

        assert_eq!(report.total(), 5);
        assert_eq!(report.succeeded, 3);
        assert_eq!(report.failed, 2);

        assert_eq!(report.items[0].output, Some(10));
        assert!(report.items[1].error.as_deref().unwrap().contains("item 2"));
        assert_eq!(report.items[4].output, Some(50));
    }

    #[tokio::test(start_paused = true)]
    async fn runs_items_in_submission_order() {
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let seen_in_op = seen.clone();

        run_sequential(vec!["a", "b", "c"], Duration::from_millis(100), move |s| {
            let seen = seen_in_op.clone();
            async move {
                seen.lock().unwrap().push(s);
                Ok::<_, Error>(())
            }
        })
        .await;

        assert_eq!(*seen.lock().unwrap(), vec!["a", "b", "c"]);
    }

    #[tokio::test(start_paused = true)]
    async fn pauses_between_items_but_not_before_the_first() {
        let start = tokio::time::Instant::now();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in_op = calls.clone();

        run_sequential(vec![(), (), ()], Duration::from_secs(1), move |()| {
            let calls = calls_in_op.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, Error>(())
            }
        })
        .await;

        // Two inter-item pauses for three items.
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn empty_batch_reports_zero_counts() {
        let report =
            run_sequential(Vec::<u8>::new(), Duration::from_secs(1), |_| async { Ok(0u8) }).await;
        assert_eq!(report.total(), 0);
        assert_eq!(report.succeeded, 0);
        assert_eq!(report.failed, 0);
    }
}
