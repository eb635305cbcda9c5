use async_trait::async_trait;
use depscan_model::{
    AnalyzerRun, AnalyzerRunId, Package, PackageId, Project, ProjectId,
    ProjectRepository, ProjectRepositoryId, RepositoryType, ScanJob,
    ScannerRun, ScannerRunId, StrandedWork,
};

use crate::error::Result;

/// Reads and user-driven writes behind the HTTP layer.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn create_project(&self, name: &str) -> Result<Project>;
    async fn list_projects(&self) -> Result<Vec<Project>>;
    async fn get_project(&self, id: ProjectId) -> Result<Option<Project>>;
    async fn rename_project(
        &self,
        id: ProjectId,
        name: &str,
    ) -> Result<Option<Project>>;
    /// Returns false when the project did not exist.
    async fn delete_project(&self, id: ProjectId) -> Result<bool>;

    /// Attach a repository to a project. Repository rows are shared by
    /// `(type, url)`.
    async fn attach_repository(
        &self,
        project: ProjectId,
        repo_type: RepositoryType,
        url: &str,
        path: &str,
    ) -> Result<ProjectRepository>;
    async fn list_project_repositories(
        &self,
        project: ProjectId,
    ) -> Result<Vec<ProjectRepository>>;
    async fn get_project_repository(
        &self,
        id: ProjectRepositoryId,
    ) -> Result<Option<ProjectRepository>>;

    /// Insert a `QUEUED` analyzer run.
    async fn enqueue_analyzer_run(
        &self,
        project_repository: ProjectRepositoryId,
        revision: &str,
        reference: &str,
    ) -> Result<AnalyzerRun>;
    async fn get_analyzer_run(
        &self,
        id: AnalyzerRunId,
    ) -> Result<Option<AnalyzerRun>>;
    async fn list_analyzer_runs_for_project_repository(
        &self,
        id: ProjectRepositoryId,
    ) -> Result<Vec<AnalyzerRun>>;
    async fn list_analyzer_runs_for_package(
        &self,
        id: PackageId,
    ) -> Result<Vec<AnalyzerRun>>;

    async fn list_packages(&self) -> Result<Vec<Package>>;
    async fn list_packages_for_analyzer_run(
        &self,
        id: AnalyzerRunId,
    ) -> Result<Vec<Package>>;
    async fn get_package(&self, id: PackageId) -> Result<Option<Package>>;

    async fn list_scan_jobs(&self) -> Result<Vec<ScanJob>>;

    async fn list_scanner_runs(&self) -> Result<Vec<ScannerRun>>;
    /// Newest first.
    async fn list_scanner_runs_for_package(
        &self,
        id: PackageId,
    ) -> Result<Vec<ScannerRun>>;
    async fn list_packages_for_scanner_run(
        &self,
        id: ScannerRunId,
    ) -> Result<Vec<Package>>;
    async fn get_scanner_run(
        &self,
        id: ScannerRunId,
    ) -> Result<Option<ScannerRun>>;

    /// Items sitting in a claimed, non-terminal status.
    async fn stranded_work(&self) -> Result<StrandedWork>;
}
