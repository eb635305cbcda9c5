//! In-process job store with the same semantics as the Postgres one.
//!
//! Every port call takes the single lock for its whole duration, which gives
//! each call the isolation of one database transaction.

use async_trait::async_trait;
use chrono::Utc;
use depscan_model::{
    AnalyzerResult, AnalyzerRun, AnalyzerRunClaim, AnalyzerRunId,
    AnalyzerRunStatus, Package, PackageDescriptor, PackageId, Project,
    ProjectId, ProjectRepository, ProjectRepositoryId, Provenance, Repository,
    RepositoryId, RepositoryType, ScanJob, ScanJobClaim, ScanJobId,
    ScanJobStatus, ScanSummary, ScannerDetails, ScannerRun, ScannerRunId,
    ScannerRunStatus, StrandedWork,
};
use std::collections::{BTreeSet, HashMap};
use tokio::sync::Mutex;

use crate::database::{
    descriptor_digest,
    ports::{
        AnalyzerRunStore, CatalogStore, PackageRegistration, ScanJobStore,
        ScannerRunAssignment, ScannerRunStore,
    },
};
use crate::error::{PipelineError, Result};

#[derive(Debug, Clone)]
struct AttachmentRow {
    id: ProjectRepositoryId,
    project_id: ProjectId,
    repository_id: RepositoryId,
    path: String,
}

#[derive(Debug, Default)]
struct State {
    projects: Vec<Project>,
    repositories: Vec<Repository>,
    attachments: Vec<AttachmentRow>,
    analyzer_runs: Vec<AnalyzerRun>,
    packages: Vec<Package>,
    package_digests: HashMap<String, PackageId>,
    analyzer_runs_packages: BTreeSet<(AnalyzerRunId, PackageId)>,
    scan_jobs: Vec<ScanJob>,
    scanner_runs: Vec<ScannerRun>,
    packages_scanner_runs: BTreeSet<(PackageId, ScannerRunId)>,
    analyzer_status_log: Vec<(AnalyzerRunId, AnalyzerRunStatus)>,
    scanner_status_log: Vec<(ScannerRunId, ScannerRunStatus)>,
}

impl State {
    fn attachment(&self, id: ProjectRepositoryId) -> Option<ProjectRepository> {
        let row = self.attachments.iter().find(|row| row.id == id)?;
        let repository = self
            .repositories
            .iter()
            .find(|repo| repo.id == row.repository_id)?
            .clone();
        Some(ProjectRepository {
            id: row.id,
            project_id: row.project_id,
            repository,
            path: row.path.clone(),
        })
    }

    fn package(&self, id: PackageId) -> Option<&Package> {
        self.packages.iter().find(|pkg| pkg.id == id)
    }

    fn set_analyzer_status(
        &mut self,
        id: AnalyzerRunId,
        from: AnalyzerRunStatus,
        to: AnalyzerRunStatus,
    ) -> Result<&mut AnalyzerRun> {
        if !from.can_transition_to(to) {
            return Err(PipelineError::InvalidInput(format!(
                "analyzer run {id} cannot move from {from} to {to}"
            )));
        }

        let index = self
            .analyzer_runs
            .iter()
            .position(|run| run.id == id)
            .ok_or_else(|| {
                PipelineError::NotFound(format!("analyzer run {id}"))
            })?;

        if self.analyzer_runs[index].status != from {
            return Err(PipelineError::ClaimConflict {
                entity: "analyzer run",
                id: id.to_uuid(),
                expected: from.as_str(),
            });
        }

        self.analyzer_runs[index].status = to;
        self.analyzer_status_log.push((id, to));
        Ok(&mut self.analyzer_runs[index])
    }
}

#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    state: Mutex<State>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every status written for the analyzer run, in order.
    pub async fn analyzer_status_history(
        &self,
        id: AnalyzerRunId,
    ) -> Vec<AnalyzerRunStatus> {
        let state = self.state.lock().await;
        state
            .analyzer_status_log
            .iter()
            .filter(|(run, _)| *run == id)
            .map(|(_, status)| *status)
            .collect()
    }

    pub async fn scanner_status_history(
        &self,
        id: ScannerRunId,
    ) -> Vec<ScannerRunStatus> {
        let state = self.state.lock().await;
        state
            .scanner_status_log
            .iter()
            .filter(|(run, _)| *run == id)
            .map(|(_, status)| *status)
            .collect()
    }
}

#[async_trait]
impl AnalyzerRunStore for InMemoryJobStore {
    async fn claim_next_analyzer_run(
        &self,
    ) -> Result<Option<AnalyzerRunClaim>> {
        let mut state = self.state.lock().await;
        let Some(run) = state
            .analyzer_runs
            .iter()
            .find(|run| run.status == AnalyzerRunStatus::Queued)
            .cloned()
        else {
            return Ok(None);
        };

        let project_repository =
            state.attachment(run.project_repository_id).ok_or_else(|| {
                PipelineError::Storage(format!(
                    "analyzer run {} references missing repository attachment",
                    run.id
                ))
            })?;

        let run = state
            .set_analyzer_status(
                run.id,
                AnalyzerRunStatus::Queued,
                AnalyzerRunStatus::DownloadingSourceCode,
            )?
            .clone();

        Ok(Some(AnalyzerRunClaim {
            run,
            project_repository,
        }))
    }

    async fn advance_analyzer_run(
        &self,
        id: AnalyzerRunId,
        from: AnalyzerRunStatus,
        to: AnalyzerRunStatus,
    ) -> Result<()> {
        let mut state = self.state.lock().await;
        state.set_analyzer_status(id, from, to)?;
        Ok(())
    }

    async fn fail_analyzer_run(
        &self,
        id: AnalyzerRunId,
        from: AnalyzerRunStatus,
        message: &str,
    ) -> Result<()> {
        let mut state = self.state.lock().await;
        let run =
            state.set_analyzer_status(id, from, AnalyzerRunStatus::Failed)?;
        run.failure_message = Some(message.to_string());
        Ok(())
    }

    async fn complete_analyzer_run(
        &self,
        id: AnalyzerRunId,
        result: &AnalyzerResult,
    ) -> Result<()> {
        let mut state = self.state.lock().await;
        let run = state.set_analyzer_status(
            id,
            AnalyzerRunStatus::AnalyzingDependencies,
            AnalyzerRunStatus::Success,
        )?;
        run.result = Some(result.clone());
        Ok(())
    }

    async fn register_discovered_package(
        &self,
        run: AnalyzerRunId,
        descriptor: &PackageDescriptor,
    ) -> Result<PackageRegistration> {
        let digest = descriptor_digest(descriptor)?;
        let mut state = self.state.lock().await;

        let existing = state.package_digests.get(&digest).copied();
        let (package_id, created) = match existing {
            Some(id) => (id, false),
            None => {
                let package = Package {
                    id: PackageId::new(),
                    created_at: Utc::now(),
                    descriptor: descriptor.clone(),
                };
                let id = package.id;
                state.packages.push(package);
                state.package_digests.insert(digest, id);
                (id, true)
            }
        };

        state.analyzer_runs_packages.insert((run, package_id));

        let scanned = state
            .packages_scanner_runs
            .iter()
            .any(|(pkg, _)| *pkg == package_id);

        let scan_job_id = if scanned {
            None
        } else {
            let job = ScanJob {
                id: ScanJobId::new(),
                created_at: Utc::now(),
                status: ScanJobStatus::Queued,
                package_id,
            };
            let id = job.id;
            state.scan_jobs.push(job);
            Some(id)
        };

        Ok(PackageRegistration {
            package_id,
            created,
            scan_job_id,
        })
    }
}

#[async_trait]
impl ScanJobStore for InMemoryJobStore {
    async fn claim_next_scan_job(&self) -> Result<Option<ScanJobClaim>> {
        let mut state = self.state.lock().await;
        let Some(index) = state
            .scan_jobs
            .iter()
            .position(|job| job.status == ScanJobStatus::Queued)
        else {
            return Ok(None);
        };

        let package_id = state.scan_jobs[index].package_id;
        let package = state.package(package_id).cloned().ok_or_else(|| {
            PipelineError::Storage(format!(
                "scan job references missing package {package_id}"
            ))
        })?;

        let job = &mut state.scan_jobs[index];
        job.status = ScanJobStatus::InProgress;
        let job = job.clone();

        Ok(Some(ScanJobClaim { job, package }))
    }

    async fn attach_or_create_scanner_run(
        &self,
        package: PackageId,
        provenance: &Provenance,
    ) -> Result<ScannerRunAssignment> {
        let mut state = self.state.lock().await;
        let existing = state
            .scanner_runs
            .iter()
            .find(|run| run.provenance == *provenance)
            .map(|run| run.id);

        let (scanner_run_id, created) = match existing {
            Some(id) => (id, false),
            None => {
                let run = ScannerRun {
                    id: ScannerRunId::new(),
                    created_at: Utc::now(),
                    provenance: provenance.clone(),
                    status: ScannerRunStatus::Queued,
                    scanner: None,
                    summary: None,
                };
                let id = run.id;
                state.scanner_runs.push(run);
                state.scanner_status_log.push((id, ScannerRunStatus::Queued));
                (id, true)
            }
        };

        let attached =
            state.packages_scanner_runs.insert((package, scanner_run_id));

        Ok(ScannerRunAssignment {
            scanner_run_id,
            created,
            attached,
        })
    }

    async fn delete_scan_job(&self, id: ScanJobId) -> Result<()> {
        let mut state = self.state.lock().await;
        state.scan_jobs.retain(|job| job.id != id);
        Ok(())
    }
}

#[async_trait]
impl ScannerRunStore for InMemoryJobStore {
    async fn claim_next_scanner_run(&self) -> Result<Option<ScannerRun>> {
        let mut state = self.state.lock().await;
        let Some(run) = state
            .scanner_runs
            .iter_mut()
            .find(|run| run.status == ScannerRunStatus::Queued)
        else {
            return Ok(None);
        };

        run.status = ScannerRunStatus::Scanning;
        let run = run.clone();
        state.scanner_status_log.push((run.id, run.status));
        Ok(Some(run))
    }

    async fn finish_scanner_run(
        &self,
        id: ScannerRunId,
        status: ScannerRunStatus,
        scanner: &ScannerDetails,
        summary: &ScanSummary,
    ) -> Result<()> {
        if !ScannerRunStatus::Scanning.can_transition_to(status) {
            return Err(PipelineError::InvalidInput(format!(
                "scanner run {id} cannot finish as {status}"
            )));
        }

        let mut state = self.state.lock().await;
        let run = state
            .scanner_runs
            .iter_mut()
            .find(|run| run.id == id)
            .ok_or_else(|| {
                PipelineError::NotFound(format!("scanner run {id}"))
            })?;

        if run.status != ScannerRunStatus::Scanning {
            return Err(PipelineError::ClaimConflict {
                entity: "scanner run",
                id: id.to_uuid(),
                expected: ScannerRunStatus::Scanning.as_str(),
            });
        }

        run.status = status;
        run.scanner = Some(scanner.clone());
        run.summary = Some(summary.clone());
        state.scanner_status_log.push((id, status));
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for InMemoryJobStore {
    async fn create_project(&self, name: &str) -> Result<Project> {
        let project = Project {
            id: ProjectId::new(),
            name: name.to_string(),
        };
        self.state.lock().await.projects.push(project.clone());
        Ok(project)
    }

    async fn list_projects(&self) -> Result<Vec<Project>> {
        Ok(self.state.lock().await.projects.clone())
    }

    async fn get_project(&self, id: ProjectId) -> Result<Option<Project>> {
        let state = self.state.lock().await;
        Ok(state.projects.iter().find(|p| p.id == id).cloned())
    }

    async fn rename_project(
        &self,
        id: ProjectId,
        name: &str,
    ) -> Result<Option<Project>> {
        let mut state = self.state.lock().await;
        Ok(state.projects.iter_mut().find(|p| p.id == id).map(|project| {
            project.name = name.to_string();
            project.clone()
        }))
    }

    async fn delete_project(&self, id: ProjectId) -> Result<bool> {
        let mut state = self.state.lock().await;
        if state.attachments.iter().any(|row| row.project_id == id) {
            return Err(PipelineError::Conflict(format!(
                "project {id} still has repositories attached"
            )));
        }
        let before = state.projects.len();
        state.projects.retain(|p| p.id != id);
        Ok(state.projects.len() < before)
    }

    async fn attach_repository(
        &self,
        project: ProjectId,
        repo_type: RepositoryType,
        url: &str,
        path: &str,
    ) -> Result<ProjectRepository> {
        let mut state = self.state.lock().await;
        if !state.projects.iter().any(|p| p.id == project) {
            return Err(PipelineError::NotFound(format!("project {project}")));
        }

        let existing = state
            .repositories
            .iter()
            .find(|repo| repo.repo_type == repo_type && repo.url == url)
            .map(|repo| repo.id);
        let repository_id = match existing {
            Some(id) => id,
            None => {
                let repo = Repository {
                    id: RepositoryId::new(),
                    repo_type,
                    url: url.to_string(),
                };
                let id = repo.id;
                state.repositories.push(repo);
                id
            }
        };

        let id = ProjectRepositoryId::new();
        state.attachments.push(AttachmentRow {
            id,
            project_id: project,
            repository_id,
            path: path.to_string(),
        });

        state.attachment(id).ok_or_else(|| {
            PipelineError::Storage(format!(
                "project repository {id} vanished after insert"
            ))
        })
    }

    async fn list_project_repositories(
        &self,
        project: ProjectId,
    ) -> Result<Vec<ProjectRepository>> {
        let state = self.state.lock().await;
        Ok(state
            .attachments
            .iter()
            .filter(|row| row.project_id == project)
            .filter_map(|row| state.attachment(row.id))
            .collect())
    }

    async fn get_project_repository(
        &self,
        id: ProjectRepositoryId,
    ) -> Result<Option<ProjectRepository>> {
        Ok(self.state.lock().await.attachment(id))
    }

    async fn enqueue_analyzer_run(
        &self,
        project_repository: ProjectRepositoryId,
        revision: &str,
        reference: &str,
    ) -> Result<AnalyzerRun> {
        let mut state = self.state.lock().await;
        if state.attachment(project_repository).is_none() {
            return Err(PipelineError::NotFound(format!(
                "project repository {project_repository}"
            )));
        }

        let run = AnalyzerRun {
            id: AnalyzerRunId::new(),
            project_repository_id: project_repository,
            created_at: Utc::now(),
            revision: revision.to_string(),
            reference: reference.to_string(),
            status: AnalyzerRunStatus::Queued,
            result: None,
            failure_message: None,
        };
        state.analyzer_status_log.push((run.id, run.status));
        state.analyzer_runs.push(run.clone());
        Ok(run)
    }

    async fn get_analyzer_run(
        &self,
        id: AnalyzerRunId,
    ) -> Result<Option<AnalyzerRun>> {
        let state = self.state.lock().await;
        Ok(state.analyzer_runs.iter().find(|run| run.id == id).cloned())
    }

    async fn list_analyzer_runs_for_project_repository(
        &self,
        id: ProjectRepositoryId,
    ) -> Result<Vec<AnalyzerRun>> {
        let state = self.state.lock().await;
        Ok(state
            .analyzer_runs
            .iter()
            .rev()
            .filter(|run| run.project_repository_id == id)
            .cloned()
            .collect())
    }

    async fn list_analyzer_runs_for_package(
        &self,
        id: PackageId,
    ) -> Result<Vec<AnalyzerRun>> {
        let state = self.state.lock().await;
        Ok(state
            .analyzer_runs
            .iter()
            .rev()
            .filter(|run| state.analyzer_runs_packages.contains(&(run.id, id)))
            .cloned()
            .collect())
    }

    async fn list_packages(&self) -> Result<Vec<Package>> {
        let state = self.state.lock().await;
        let mut packages = state.packages.clone();
        packages.sort_by(|a, b| {
            a.descriptor
                .id
                .to_coordinates()
                .cmp(&b.descriptor.id.to_coordinates())
        });
        Ok(packages)
    }

    async fn list_packages_for_analyzer_run(
        &self,
        id: AnalyzerRunId,
    ) -> Result<Vec<Package>> {
        let state = self.state.lock().await;
        let mut packages: Vec<Package> = state
            .packages
            .iter()
            .filter(|pkg| state.analyzer_runs_packages.contains(&(id, pkg.id)))
            .cloned()
            .collect();
        packages.sort_by(|a, b| {
            a.descriptor
                .id
                .to_coordinates()
                .cmp(&b.descriptor.id.to_coordinates())
        });
        Ok(packages)
    }

    async fn get_package(&self, id: PackageId) -> Result<Option<Package>> {
        Ok(self.state.lock().await.package(id).cloned())
    }

    async fn list_scan_jobs(&self) -> Result<Vec<ScanJob>> {
        Ok(self.state.lock().await.scan_jobs.clone())
    }

    async fn list_scanner_runs(&self) -> Result<Vec<ScannerRun>> {
        let state = self.state.lock().await;
        Ok(state.scanner_runs.iter().rev().cloned().collect())
    }

    async fn list_scanner_runs_for_package(
        &self,
        id: PackageId,
    ) -> Result<Vec<ScannerRun>> {
        let state = self.state.lock().await;
        Ok(state
            .scanner_runs
            .iter()
            .rev()
            .filter(|run| state.packages_scanner_runs.contains(&(id, run.id)))
            .cloned()
            .collect())
    }

    async fn list_packages_for_scanner_run(
        &self,
        id: ScannerRunId,
    ) -> Result<Vec<Package>> {
        let state = self.state.lock().await;
        Ok(state
            .packages
            .iter()
            .filter(|pkg| state.packages_scanner_runs.contains(&(pkg.id, id)))
            .cloned()
            .collect())
    }

    async fn get_scanner_run(
        &self,
        id: ScannerRunId,
    ) -> Result<Option<ScannerRun>> {
        let state = self.state.lock().await;
        Ok(state.scanner_runs.iter().find(|run| run.id == id).cloned())
    }

    async fn stranded_work(&self) -> Result<StrandedWork> {
        let state = self.state.lock().await;
        Ok(StrandedWork {
            analyzer_runs: state
                .analyzer_runs
                .iter()
                .filter(|run| {
                    AnalyzerRunStatus::IN_FLIGHT.contains(&run.status)
                })
                .count() as u64,
            scan_jobs: state
                .scan_jobs
                .iter()
                .filter(|job| job.status == ScanJobStatus::InProgress)
                .count() as u64,
            scanner_runs: state
                .scanner_runs
                .iter()
                .filter(|run| run.status == ScannerRunStatus::Scanning)
                .count() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depscan_model::{Identifier, VcsInfo, VcsType};

    async fn queued_run(store: &InMemoryJobStore) -> AnalyzerRun {
        let project = store.create_project("demo").await.unwrap();
        let attachment = store
            .attach_repository(
                project.id,
                RepositoryType::Git,
                "https://example.com/repo.git",
                "",
            )
            .await
            .unwrap();
        store
            .enqueue_analyzer_run(attachment.id, "main", "")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn claim_flips_exactly_once() {
        let store = InMemoryJobStore::new();
        let run = queued_run(&store).await;

        let claim = store.claim_next_analyzer_run().await.unwrap().unwrap();
        assert_eq!(claim.run.id, run.id);
        assert_eq!(claim.run.status, AnalyzerRunStatus::DownloadingSourceCode);
        assert!(store.claim_next_analyzer_run().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn stale_status_write_is_a_conflict() {
        let store = InMemoryJobStore::new();
        let run = queued_run(&store).await;
        store.claim_next_analyzer_run().await.unwrap();
        store
            .fail_analyzer_run(
                run.id,
                AnalyzerRunStatus::DownloadingSourceCode,
                "boom",
            )
            .await
            .unwrap();

        let err = store
            .advance_analyzer_run(
                run.id,
                AnalyzerRunStatus::DownloadingSourceCode,
                AnalyzerRunStatus::AnalyzingDependencies,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::ClaimConflict { .. }));
    }

    #[tokio::test]
    async fn backward_transition_is_rejected() {
        let store = InMemoryJobStore::new();
        let run = queued_run(&store).await;
        let err = store
            .advance_analyzer_run(
                run.id,
                AnalyzerRunStatus::Success,
                AnalyzerRunStatus::Queued,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn identical_descriptors_share_one_package() {
        let store = InMemoryJobStore::new();
        let run = queued_run(&store).await;
        let descriptor =
            PackageDescriptor::new(Identifier::new("NPM", "", "a", "1.0.0"));

        let first = store
            .register_discovered_package(run.id, &descriptor)
            .await
            .unwrap();
        let second = store
            .register_discovered_package(run.id, &descriptor)
            .await
            .unwrap();

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.package_id, second.package_id);
        assert_eq!(store.list_packages().await.unwrap().len(), 1);
        // Duplicate pending requests are tolerated.
        assert_eq!(store.list_scan_jobs().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn already_scanned_package_gets_no_job() {
        let store = InMemoryJobStore::new();
        let run = queued_run(&store).await;
        let mut descriptor =
            PackageDescriptor::new(Identifier::new("NPM", "", "a", "1.0.0"));
        descriptor.vcs = VcsInfo {
            vcs_type: VcsType::Git,
            url: "https://example.com/a.git".into(),
            revision: "v1".into(),
            resolved_revision: None,
            path: String::new(),
        };

        let registration = store
            .register_discovered_package(run.id, &descriptor)
            .await
            .unwrap();
        let provenance = Provenance::for_package(&descriptor).unwrap();
        store
            .attach_or_create_scanner_run(registration.package_id, &provenance)
            .await
            .unwrap();

        let again = store
            .register_discovered_package(run.id, &descriptor)
            .await
            .unwrap();
        assert_eq!(again.scan_job_id, None);
    }

    #[tokio::test]
    async fn delete_project_with_attachments_conflicts() {
        let store = InMemoryJobStore::new();
        let run = queued_run(&store).await;
        let attachment = store
            .get_project_repository(run.project_repository_id)
            .await
            .unwrap()
            .unwrap();

        let err =
            store.delete_project(attachment.project_id).await.unwrap_err();
        assert!(matches!(err, PipelineError::Conflict(_)));
    }

    #[tokio::test]
    async fn repositories_are_shared_by_type_and_url() {
        let store = InMemoryJobStore::new();
        let a = store.create_project("a").await.unwrap();
        let b = store.create_project("b").await.unwrap();
        let url = "https://example.com/shared.git";

        let first = store
            .attach_repository(a.id, RepositoryType::Git, url, "x")
            .await
            .unwrap();
        let second = store
            .attach_repository(b.id, RepositoryType::Git, url, "y")
            .await
            .unwrap();

        assert_eq!(first.repository.id, second.repository.id);
        assert_ne!(first.id, second.id);
    }
}
