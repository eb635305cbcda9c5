use async_trait::async_trait;
use depscan_model::{
    PackageId, Provenance, ScanJobClaim, ScanJobId, ScannerRunId,
};

use crate::error::Result;

/// Where a package ended up after provenance dedup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScannerRunAssignment {
    pub scanner_run_id: ScannerRunId,
    /// A new `QUEUED` scanner run was created for this provenance.
    pub created: bool,
    /// The package was newly linked; false when it already was.
    pub attached: bool,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ScanJobStore: Send + Sync {
    /// Atomically flip the oldest `QUEUED` job to `IN_PROGRESS`.
    async fn claim_next_scan_job(&self) -> Result<Option<ScanJobClaim>>;

    /// Attach the package to the scanner run with an equal provenance, or
    /// create a `QUEUED` run for it. The existing run's status is untouched.
    async fn attach_or_create_scanner_run(
        &self,
        package: PackageId,
        provenance: &Provenance,
    ) -> Result<ScannerRunAssignment>;

    async fn delete_scan_job(&self, id: ScanJobId) -> Result<()>;
}
