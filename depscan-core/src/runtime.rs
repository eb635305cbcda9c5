//! Supervision of the three worker loops.

use std::{sync::Arc, time::Duration};
use tokio::{sync::Mutex, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::adapters::{DependencyAnalyzer, PackageScanner, SourceFetcher};
use crate::database::ports::JobStore;
use crate::error::Result;
use crate::worker::{
    AnalyzerWorker, AnalyzerWorkerSettings, PipelineWorker, ScanJobWorker,
    ScannerWorker, ScannerWorkerSettings, run_worker_loop,
};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// External tools shared by the workers.
#[derive(Clone)]
pub struct PipelineAdapters {
    pub fetcher: Arc<dyn SourceFetcher>,
    pub analyzer: Arc<dyn DependencyAnalyzer>,
    pub scanner: Arc<dyn PackageScanner>,
}

impl std::fmt::Debug for PipelineAdapters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineAdapters").finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct RuntimeSettings {
    pub poll_interval: Duration,
    pub analyzer: AnalyzerWorkerSettings,
    pub scanner: ScannerWorkerSettings,
    pub enable_analyzer: bool,
    pub enable_scan_jobs: bool,
    pub enable_scanner: bool,
}

pub struct PipelineRuntime {
    shutdown_token: CancellationToken,
    handles: Mutex<Vec<(&'static str, JoinHandle<()>)>>,
}

impl std::fmt::Debug for PipelineRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineRuntime")
            .field("shutdown_cancelled", &self.shutdown_token.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl PipelineRuntime {
    /// Report stranded work, then spawn one loop per enabled worker.
    ///
    /// Nothing is requeued: items left in an in-progress status by a crash
    /// stay there until an operator intervenes.
    pub async fn start<S>(
        store: Arc<S>,
        adapters: PipelineAdapters,
        settings: RuntimeSettings,
    ) -> Result<Self>
    where
        S: JobStore + 'static,
    {
        let stranded = store.stranded_work().await?;
        if !stranded.is_empty() {
            warn!(
                analyzer_runs = stranded.analyzer_runs,
                scan_jobs = stranded.scan_jobs,
                scanner_runs = stranded.scanner_runs,
                "found work stranded in an in-progress status; \
                 it will not be resumed"
            );
        }

        let mut workers: Vec<Arc<dyn PipelineWorker>> = Vec::new();
        if settings.enable_analyzer {
            workers.push(Arc::new(AnalyzerWorker::new(
                store.clone(),
                adapters.fetcher.clone(),
                adapters.analyzer.clone(),
                settings.analyzer.clone(),
            )));
        }
        if settings.enable_scan_jobs {
            workers.push(Arc::new(ScanJobWorker::new(store.clone())));
        }
        if settings.enable_scanner {
            workers.push(Arc::new(ScannerWorker::new(
                store.clone(),
                adapters.scanner.clone(),
                settings.scanner.clone(),
            )));
        }

        let shutdown_token = CancellationToken::new();
        let handles = workers
            .into_iter()
            .map(|worker| {
                let name = worker.name();
                let handle = tokio::spawn(run_worker_loop(
                    worker,
                    settings.poll_interval,
                    shutdown_token.child_token(),
                ));
                (name, handle)
            })
            .collect::<Vec<_>>();

        let names: Vec<_> = handles.iter().map(|(name, _)| *name).collect();
        info!(
            workers = ?names,
            poll_interval = ?settings.poll_interval,
            "pipeline runtime started"
        );

        Ok(Self {
            shutdown_token,
            handles: Mutex::new(handles),
        })
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    /// Cancel every loop and wait for in-flight iterations to finish.
    pub async fn shutdown(&self) {
        info!("shutting down pipeline runtime");
        self.shutdown_token.cancel();

        let handles = std::mem::take(&mut *self.handles.lock().await);
        for (name, handle) in handles {
            match tokio::time::timeout(SHUTDOWN_GRACE, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(worker = name, "worker task failed: {e}"),
                Err(_) => warn!(
                    worker = name,
                    "worker task timed out during shutdown"
                ),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{
        MockDependencyAnalyzer, MockPackageScanner, MockSourceFetcher,
    };
    use crate::database::{memory::InMemoryJobStore, ports::CatalogStore};
    use crate::worker::test_support::{git_package, queued_run};
    use chrono::Utc;
    use depscan_model::{
        AnalyzerResult, AnalyzerRunStatus, ScanOutcome, ScanSummary,
        ScannerDetails, ScannerRunStatus,
    };
    use std::collections::BTreeSet;
    use std::path::Path;

    fn settings(data_dir: &Path) -> RuntimeSettings {
        RuntimeSettings {
            poll_interval: Duration::from_secs(5),
            analyzer: AnalyzerWorkerSettings::new(data_dir.join("download")),
            scanner: ScannerWorkerSettings::under(data_dir),
            enable_analyzer: true,
            enable_scan_jobs: true,
            enable_scanner: true,
        }
    }

    const SHARED_URL: &str = "https://example.com/shared.git";

    fn adapters() -> PipelineAdapters {
        let mut fetcher = MockSourceFetcher::new();
        fetcher.expect_fetch().returning(|_, _, _| Ok(()));

        let mut analyzer = MockDependencyAnalyzer::new();
        analyzer.expect_analyze().returning(|_, _, _| {
            Ok(Some(AnalyzerResult {
                packages: vec![
                    git_package("left", SHARED_URL, "left"),
                    git_package("right", SHARED_URL, "right"),
                ],
                ..AnalyzerResult::default()
            }))
        });

        let mut scanner = MockPackageScanner::new();
        scanner.expect_details().returning(ScannerDetails::default);
        scanner.expect_scan().times(1).returning(|_, _, _| {
            let now = Utc::now();
            Ok(ScanOutcome {
                scanner: ScannerDetails {
                    name: "ScanCode".into(),
                    ..ScannerDetails::default()
                },
                summary: ScanSummary {
                    start_time: now,
                    end_time: now,
                    file_count: 4,
                    package_verification_code: String::new(),
                    license_findings: BTreeSet::new(),
                    copyright_findings: BTreeSet::new(),
                    issues: Vec::new(),
                },
            })
        });

        PipelineAdapters {
            fetcher: Arc::new(fetcher),
            analyzer: Arc::new(analyzer),
            scanner: Arc::new(scanner),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn queued_run_flows_through_all_three_stages() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(InMemoryJobStore::new());
        let run = queued_run(&store, "").await;

        let runtime = PipelineRuntime::start(
            store.clone(),
            adapters(),
            settings(dir.path()),
        )
        .await
        .unwrap();

        let mut finished = false;
        for _ in 0..20 {
            tokio::time::sleep(Duration::from_secs(5)).await;
            let runs = store.list_scanner_runs().await.unwrap();
            if runs.len() == 1 && runs[0].status == ScannerRunStatus::Success {
                finished = true;
                break;
            }
        }
        runtime.shutdown().await;
        assert!(finished, "pipeline did not settle");

        let stored = store.get_analyzer_run(run.id).await.unwrap().unwrap();
        assert_eq!(stored.status, AnalyzerRunStatus::Success);
        assert!(store.list_scan_jobs().await.unwrap().is_empty());
        let scanner_run = store.list_scanner_runs().await.unwrap().remove(0);
        assert_eq!(
            store
                .list_packages_for_scanner_run(scanner_run.id)
                .await
                .unwrap()
                .len(),
            2
        );
    }

    #[tokio::test(start_paused = true)]
    async fn disabled_workers_leave_work_queued() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(InMemoryJobStore::new());
        let run = queued_run(&store, "").await;

        let mut settings = settings(dir.path());
        settings.enable_analyzer = false;
        let runtime = PipelineRuntime::start(
            store.clone(),
            PipelineAdapters {
                fetcher: Arc::new(MockSourceFetcher::new()),
                analyzer: Arc::new(MockDependencyAnalyzer::new()),
                scanner: Arc::new(MockPackageScanner::new()),
            },
            settings,
        )
        .await
        .unwrap();

        tokio::time::sleep(Duration::from_secs(30)).await;
        runtime.shutdown().await;

        let stored = store.get_analyzer_run(run.id).await.unwrap().unwrap();
        assert_eq!(stored.status, AnalyzerRunStatus::Queued);
        assert!(runtime.shutdown_token().is_cancelled());
    }
}
