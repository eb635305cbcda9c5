//! The three polling workers of the pipeline.
//!
//! Workers never talk to each other. Each one owns a single state machine
//! and moves items through it by claiming rows from the job store.

pub mod analyzer;
pub mod scan_job;
pub mod scanner;

#[cfg(test)]
pub(crate) mod test_support;

use async_trait::async_trait;
use std::{sync::Arc, time::Duration};
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::error::Result;

pub use analyzer::{AnalyzerWorker, AnalyzerWorkerSettings};
pub use scan_job::ScanJobWorker;
pub use scanner::{ScannerWorker, ScannerWorkerSettings};

/// Result of one loop iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Nothing eligible was waiting.
    Idle,
    /// One item was claimed and driven as far as it goes.
    Processed,
}

#[async_trait]
pub trait PipelineWorker: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    /// Claim at most one eligible item and process it.
    ///
    /// Failures of the item itself are recorded on the item and reported as
    /// `Processed`; only storage failures surface as `Err`.
    async fn poll_once(&self) -> Result<PollOutcome>;
}

/// Poll `worker` every `poll_interval` until `cancel` fires.
///
/// Each iteration runs in its own task. Errors are logged and the loop keeps
/// polling. A panicking iteration is logged the same way only when panics
/// unwind; the release profile aborts the process instead. Cancellation is
/// only observed between iterations, so an in-flight item always runs to
/// completion.
pub async fn run_worker_loop(
    worker: Arc<dyn PipelineWorker>,
    poll_interval: Duration,
    cancel: CancellationToken,
) {
    let name = worker.name();
    let mut ticker =
        time::interval_at(Instant::now() + poll_interval, poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(worker = name, ?poll_interval, "worker started");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let iteration = Arc::clone(&worker);
        match tokio::spawn(async move { iteration.poll_once().await }).await {
            Ok(Ok(PollOutcome::Processed)) => {
                debug!(worker = name, "iteration finished")
            }
            Ok(Ok(PollOutcome::Idle)) => {}
            Ok(Err(err)) => {
                error!(worker = name, error = %err, "iteration aborted")
            }
            Err(join_err) => {
                error!(worker = name, error = %join_err, "iteration panicked")
            }
        }
    }

    info!(worker = name, "worker stopped");
}
