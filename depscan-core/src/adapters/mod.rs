//! External tools the pipeline drives: source download, dependency analysis
//! and scanning. Each call either returns a structured result or fails with
//! a descriptive error whose full chain becomes the recorded message.

pub mod command;
pub mod git;

use async_trait::async_trait;
use depscan_model::{
    AnalyzerConfig, AnalyzerResult, PackageDescriptor, ScanOutcome,
    ScannerDetails, VcsInfo,
};
use std::path::Path;

pub use command::{CommandAnalyzer, CommandScanner};
pub use git::GitSourceFetcher;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    /// Fetch the working tree described by `locator` into `dest`.
    async fn fetch(
        &self,
        locator: &VcsInfo,
        dest: &Path,
        allow_moving_revision: bool,
    ) -> anyhow::Result<()>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DependencyAnalyzer: Send + Sync {
    /// `Ok(None)` means the tool ran but produced no result.
    async fn analyze(
        &self,
        source_dir: &Path,
        backends: &[String],
        config: &AnalyzerConfig,
    ) -> anyhow::Result<Option<AnalyzerResult>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PackageScanner: Send + Sync {
    fn details(&self) -> ScannerDetails;

    async fn scan(
        &self,
        target: &PackageDescriptor,
        output_dir: &Path,
        download_dir: &Path,
    ) -> anyhow::Result<ScanOutcome>;
}
