//! Job store ports grouped by pipeline stage.
//!
//! Workers only see the port of the stage they own; the HTTP layer goes
//! through [`catalog::CatalogStore`]. Implementations live in
//! [`crate::database::postgres`] and [`crate::database::memory`].

pub mod analyzer_runs;
pub mod catalog;
pub mod scan_jobs;
pub mod scanner_runs;

pub use analyzer_runs::{AnalyzerRunStore, PackageRegistration};
pub use catalog::CatalogStore;
pub use scan_jobs::{ScanJobStore, ScannerRunAssignment};
pub use scanner_runs::ScannerRunStore;

#[cfg(test)]
pub use analyzer_runs::MockAnalyzerRunStore;
#[cfg(test)]
pub use scan_jobs::MockScanJobStore;
#[cfg(test)]
pub use scanner_runs::MockScannerRunStore;

/// Everything a single backing store provides.
pub trait JobStore:
    AnalyzerRunStore + ScanJobStore + ScannerRunStore + CatalogStore
{
}

impl<T> JobStore for T where
    T: AnalyzerRunStore + ScanJobStore + ScannerRunStore + CatalogStore
{
}
