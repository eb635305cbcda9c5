use async_trait::async_trait;
use depscan_model::{
    ScanSummary, ScannerDetails, ScannerRun, ScannerRunId, ScannerRunStatus,
};

use crate::error::Result;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ScannerRunStore: Send + Sync {
    /// Atomically flip the oldest `QUEUED` scanner run to `SCANNING`.
    async fn claim_next_scanner_run(&self) -> Result<Option<ScannerRun>>;

    /// Record the scanner identity and summary and move the run from
    /// `SCANNING` to `status`, which must be terminal.
    async fn finish_scanner_run(
        &self,
        id: ScannerRunId,
        status: ScannerRunStatus,
        scanner: &ScannerDetails,
        summary: &ScanSummary,
    ) -> Result<()>;
}
