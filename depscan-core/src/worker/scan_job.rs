use async_trait::async_trait;
use depscan_model::{Package, Provenance, ScanJobClaim};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{PipelineWorker, PollOutcome};
use crate::database::ports::{ScanJobStore, ScannerRunAssignment};
use crate::error::{PipelineError, Result};

/// Collapses scan jobs onto scanner runs keyed by provenance. A job lives
/// for exactly one attempt and is deleted afterwards, whatever the outcome.
pub struct ScanJobWorker {
    store: Arc<dyn ScanJobStore>,
}

impl std::fmt::Debug for ScanJobWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanJobWorker").finish_non_exhaustive()
    }
}

impl ScanJobWorker {
    pub fn new(store: Arc<dyn ScanJobStore>) -> Self {
        Self { store }
    }

    async fn assign(&self, package: &Package) -> Result<ScannerRunAssignment> {
        let provenance = Provenance::for_package(&package.descriptor)
            .ok_or_else(|| {
                PipelineError::ProvenanceMissing(
                    package.descriptor.id.to_coordinates(),
                )
            })?;
        debug!(package = %package.id, %provenance, "resolved provenance");
        self.store
            .attach_or_create_scanner_run(package.id, &provenance)
            .await
    }
}

#[async_trait]
impl PipelineWorker for ScanJobWorker {
    fn name(&self) -> &'static str {
        "scan-job"
    }

    async fn poll_once(&self) -> Result<PollOutcome> {
        debug!("searching for queued scan job");
        let Some(ScanJobClaim { job, package }) =
            self.store.claim_next_scan_job().await?
        else {
            debug!("no queued scan job found");
            return Ok(PollOutcome::Idle);
        };

        let assigned = self.assign(&package).await;

        match &assigned {
            Ok(assignment) => info!(
                scan_job = %job.id,
                package = %package.descriptor.id,
                scanner_run = %assignment.scanner_run_id,
                created = assignment.created,
                "assigned package to scanner run"
            ),
            Err(err @ PipelineError::ProvenanceMissing(_)) => warn!(
                scan_job = %job.id,
                package = %package.descriptor.id,
                error = %err,
                "dropping scan job"
            ),
            Err(_) => {}
        }

        self.store.delete_scan_job(job.id).await?;
        debug!(scan_job = %job.id, "deleted scan job");

        match assigned {
            Err(err) if err.is_storage() => Err(err),
            _ => Ok(PollOutcome::Processed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{
        memory::InMemoryJobStore,
        ports::{AnalyzerRunStore, CatalogStore, MockScanJobStore},
    };
    use crate::worker::test_support::{
        artifact_package, bare_package, git_package, queued_run,
    };
    use chrono::Utc;
    use depscan_model::{
        PackageDescriptor, PackageId, ScanJob, ScanJobId, ScanJobStatus,
        ScannerRunStatus,
    };
    use mockall::predicate::eq;

    async fn register(
        store: &InMemoryJobStore,
        descriptors: &[PackageDescriptor],
    ) {
        let run = queued_run(store, "").await;
        for descriptor in descriptors {
            store
                .register_discovered_package(run.id, descriptor)
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn subpaths_of_one_revision_share_a_scanner_run() {
        let store = Arc::new(InMemoryJobStore::new());
        let url = "https://example.com/mono.git";
        register(
            &store,
            &[git_package("a", url, "a/"), git_package("b", url, "b/")],
        )
        .await;
        let worker = ScanJobWorker::new(store.clone());

        assert_eq!(worker.poll_once().await.unwrap(), PollOutcome::Processed);
        let runs = store.list_scanner_runs().await.unwrap();
        assert_eq!(runs.len(), 1);
        let scanner_run = runs[0].id;
        assert_eq!(
            store
                .list_packages_for_scanner_run(scanner_run)
                .await
                .unwrap()
                .len(),
            1
        );

        assert_eq!(worker.poll_once().await.unwrap(), PollOutcome::Processed);
        let runs = store.list_scanner_runs().await.unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].status, ScannerRunStatus::Queued);
        assert_eq!(
            store
                .list_packages_for_scanner_run(scanner_run)
                .await
                .unwrap()
                .len(),
            2
        );
        let Provenance::Repository { vcs_info } = &runs[0].provenance else {
            panic!("expected a repository provenance");
        };
        assert!(vcs_info.path.is_empty());

        assert!(store.list_scan_jobs().await.unwrap().is_empty());
        assert_eq!(worker.poll_once().await.unwrap(), PollOutcome::Idle);
    }

    #[tokio::test]
    async fn package_without_locators_is_dropped() {
        let store = Arc::new(InMemoryJobStore::new());
        register(&store, &[bare_package("orphan")]).await;
        let worker = ScanJobWorker::new(store.clone());

        assert_eq!(worker.poll_once().await.unwrap(), PollOutcome::Processed);

        assert!(store.list_scan_jobs().await.unwrap().is_empty());
        assert!(store.list_scanner_runs().await.unwrap().is_empty());
        let packages = store.list_packages().await.unwrap();
        assert_eq!(packages.len(), 1);
        assert!(
            store
                .list_scanner_runs_for_package(packages[0].id)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn artifact_provenance_is_used_without_vcs() {
        let store = Arc::new(InMemoryJobStore::new());
        register(&store, &[artifact_package("tarball")]).await;
        let worker = ScanJobWorker::new(store.clone());

        worker.poll_once().await.unwrap();

        let runs = store.list_scanner_runs().await.unwrap();
        assert_eq!(runs.len(), 1);
        assert!(matches!(runs[0].provenance, Provenance::Artifact { .. }));
    }

    fn claim(descriptor: PackageDescriptor) -> ScanJobClaim {
        let package_id = PackageId::new();
        ScanJobClaim {
            job: ScanJob {
                id: ScanJobId::new(),
                created_at: Utc::now(),
                status: ScanJobStatus::InProgress,
                package_id,
            },
            package: Package {
                id: package_id,
                created_at: Utc::now(),
                descriptor,
            },
        }
    }

    #[tokio::test]
    async fn storage_failure_still_deletes_the_job() {
        let claimed = claim(git_package("x", "https://example.com/x.git", ""));
        let job_id = claimed.job.id;

        let mut store = MockScanJobStore::new();
        store
            .expect_claim_next_scan_job()
            .times(1)
            .returning(move || Ok(Some(claimed.clone())));
        store
            .expect_attach_or_create_scanner_run()
            .times(1)
            .returning(|_, _| {
                Err(PipelineError::Storage("connection reset".into()))
            });
        store
            .expect_delete_scan_job()
            .with(eq(job_id))
            .times(1)
            .returning(|_| Ok(()));

        let worker = ScanJobWorker::new(Arc::new(store));
        let err = worker.poll_once().await.unwrap_err();
        assert!(err.is_storage());
    }

    #[tokio::test]
    async fn provenance_missing_never_reaches_the_store() {
        let claimed = claim(bare_package("nothing"));
        let job_id = claimed.job.id;

        let mut store = MockScanJobStore::new();
        store
            .expect_claim_next_scan_job()
            .returning(move || Ok(Some(claimed.clone())));
        store.expect_attach_or_create_scanner_run().never();
        store
            .expect_delete_scan_job()
            .with(eq(job_id))
            .times(1)
            .returning(|_| Ok(()));

        let worker = ScanJobWorker::new(Arc::new(store));
        assert_eq!(worker.poll_once().await.unwrap(), PollOutcome::Processed);
    }
}
