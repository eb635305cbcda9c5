use async_trait::async_trait;
use depscan_model::{
    AnalyzerResult, AnalyzerRunClaim, AnalyzerRunId, AnalyzerRunStatus,
    PackageDescriptor, PackageId, ScanJobId,
};

use crate::error::Result;

/// Outcome of registering one discovered package for an analyzer run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackageRegistration {
    pub package_id: PackageId,
    /// The descriptor had not been seen before.
    pub created: bool,
    /// Set when the package had no scanner run yet and a job was queued.
    pub scan_job_id: Option<ScanJobId>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AnalyzerRunStore: Send + Sync {
    /// Atomically flip the oldest `QUEUED` run to `DOWNLOADING_SOURCE_CODE`.
    /// Concurrent claimants skip rows locked by another claim.
    async fn claim_next_analyzer_run(&self) -> Result<Option<AnalyzerRunClaim>>;

    /// Compare-and-set status write. Fails with `ClaimConflict` when the run
    /// is no longer in `from`.
    async fn advance_analyzer_run(
        &self,
        id: AnalyzerRunId,
        from: AnalyzerRunStatus,
        to: AnalyzerRunStatus,
    ) -> Result<()>;

    /// Move the run to `FAILED` from `from`, recording the message.
    async fn fail_analyzer_run(
        &self,
        id: AnalyzerRunId,
        from: AnalyzerRunStatus,
        message: &str,
    ) -> Result<()>;

    /// Persist the result and move the run from `ANALYZING_DEPENDENCIES`
    /// to `SUCCESS` in one transaction.
    async fn complete_analyzer_run(
        &self,
        id: AnalyzerRunId,
        result: &AnalyzerResult,
    ) -> Result<()>;

    /// Look up or create the package for this exact descriptor, link it to
    /// the run and queue a scan job if it has never been attached to a
    /// scanner run.
    async fn register_discovered_package(
        &self,
        run: AnalyzerRunId,
        descriptor: &PackageDescriptor,
    ) -> Result<PackageRegistration>;
}
