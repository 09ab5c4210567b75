//! Long-running-operation polling.
//!
//! The video and music endpoints both start a job and report progress on a
//! status endpoint. [`wait_for_operation`] is the shared wait loop: probe,
//! then sleep a fixed interval, until the job finishes or the wait budget is
//! spent. Probe failures that may be transient (network hiccups, 5xx, a
//! half-written status body) are logged and retried; only a terminal status
//! or the timeout ends the loop early.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// What a status probe observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationStatus<T> {
    /// The job is still running.
    Running,
    /// The job finished and produced a payload.
    Done(T),
    /// The job finished in an error state.
    Failed {
        /// Error code reported by the status endpoint, if any.
        code: Option<i32>,
        /// Error message reported by the status endpoint.
        message: String,
    },
}

/// Fixed-interval polling budget.
#[derive(Debug, Clone, Copy)]
pub struct PollConfig {
    /// Delay between successive status probes.
    pub interval: Duration,
    /// Total time to wait before giving up.
    pub max_wait: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            max_wait: Duration::from_secs(600),
        }
    }
}

/// Poll `probe` until the operation named `name` finishes.
///
/// One probe is always issued immediately; after that the loop sleeps
/// `config.interval` between probes. There is no backoff and no jitter.
///
/// # Errors
/// - `Error::OperationFailed` when a probe reports a terminal error.
/// - `Error::Timeout` once elapsed time exceeds `config.max_wait`; probe
///   errors encountered along the way are swallowed until then.
pub async fn wait_for_operation<T, F, Fut>(
    name: &str,
    config: PollConfig,
    mut probe: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<OperationStatus<T>>>,
{
    let started = tokio::time::Instant::now();
    let mut probes: u32 = 0;

    loop {
        probes += 1;
        match probe().await {
            Ok(OperationStatus::Done(payload)) => {
                info!(operation = name, probes, "operation completed");
                return Ok(payload);
            }
            Ok(OperationStatus::Failed { code, message }) => {
                warn!(operation = name, ?code, "operation reported terminal error");
                return Err(Error::operation_failed(name, message));
            }
            Ok(OperationStatus::Running) => {
                debug!(operation = name, probes, "operation still running");
            }
            // Probe failures are treated as transient until the timeout.
            Err(e) => {
                debug!(operation = name, probes, error = %e, "status probe failed, will retry");
            }
        }

        if started.elapsed() >= config.max_wait {
            warn!(operation = name, probes, "gave up waiting for operation");
            return Err(Error::timeout(config.max_wait.as_secs()));
        }

        tokio::time::sleep(config.interval).await;
    }
}
