use async_trait::async_trait;
use chrono::Utc;
use depscan_model::{
    ScanOutcome, ScanSummary, ScannerRun, ScannerRunId, ScannerRunStatus,
};
use std::{path::PathBuf, sync::Arc};
use tokio::fs;
use tracing::{debug, info, warn};

use super::{PipelineWorker, PollOutcome};
use crate::adapters::PackageScanner;
use crate::database::ports::ScannerRunStore;
use crate::error::{PipelineError, Result};

#[derive(Debug, Clone)]
pub struct ScannerWorkerSettings {
    pub download_root: PathBuf,
    pub output_root: PathBuf,
}

impl ScannerWorkerSettings {
    /// Lays out `download-pkg/` and `scan-output/` below `data_dir`.
    pub fn under(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            download_root: data_dir.join("download-pkg"),
            output_root: data_dir.join("scan-output"),
        }
    }

    pub fn download_dir(&self, run: ScannerRunId) -> PathBuf {
        self.download_root.join(run.to_string())
    }

    pub fn output_dir(&self, run: ScannerRunId) -> PathBuf {
        self.output_root.join(run.to_string())
    }
}

/// Scans each distinct provenance once and stores the summary on the
/// scanner run, successful or not.
pub struct ScannerWorker {
    store: Arc<dyn ScannerRunStore>,
    scanner: Arc<dyn PackageScanner>,
    settings: ScannerWorkerSettings,
}

impl std::fmt::Debug for ScannerWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScannerWorker")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl ScannerWorker {
    pub fn new(
        store: Arc<dyn ScannerRunStore>,
        scanner: Arc<dyn PackageScanner>,
        settings: ScannerWorkerSettings,
    ) -> Self {
        Self {
            store,
            scanner,
            settings,
        }
    }

    async fn scan(&self, run: &ScannerRun) -> Result<ScanOutcome> {
        let output_dir = self.settings.output_dir(run.id);
        let download_dir = self.settings.download_dir(run.id);
        fs::create_dir_all(&output_dir).await.map_err(|e| {
            PipelineError::Scan(format!(
                "Cannot create output directory {}: {e}",
                output_dir.display()
            ))
        })?;

        let target = run.provenance.scan_target();
        self.scanner
            .scan(&target, &output_dir, &download_dir)
            .await
            .map_err(|e| PipelineError::Scan(format!("{e:#}")))
    }
}

#[async_trait]
impl PipelineWorker for ScannerWorker {
    fn name(&self) -> &'static str {
        "scanner"
    }

    async fn poll_once(&self) -> Result<PollOutcome> {
        debug!("searching for queued scanner run");
        let Some(run) = self.store.claim_next_scanner_run().await? else {
            debug!("no queued scanner run found");
            return Ok(PollOutcome::Idle);
        };

        info!(
            scanner_run = %run.id,
            provenance = %run.provenance,
            "starting scan"
        );
        let started_at = Utc::now();

        match self.scan(&run).await {
            Ok(outcome) => {
                self.store
                    .finish_scanner_run(
                        run.id,
                        ScannerRunStatus::Success,
                        &outcome.scanner,
                        &outcome.summary,
                    )
                    .await?;
                info!(
                    scanner_run = %run.id,
                    files = outcome.summary.file_count,
                    licenses = outcome.summary.license_findings.len(),
                    "finished scan"
                );
            }
            Err(err) => {
                warn!(scanner_run = %run.id, error = %err, "scan failed");
                let details = self.scanner.details();
                let summary =
                    ScanSummary::failed(&details, err.to_string(), started_at);
                self.store
                    .finish_scanner_run(
                        run.id,
                        ScannerRunStatus::Failed,
                        &details,
                        &summary,
                    )
                    .await?;
            }
        }

        Ok(PollOutcome::Processed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MockPackageScanner;
    use crate::database::{
        memory::InMemoryJobStore,
        ports::{
            AnalyzerRunStore, CatalogStore, MockScannerRunStore, ScanJobStore,
        },
    };
    use crate::worker::test_support::{git_package, queued_run};
    use depscan_model::{
        LicenseFinding, Provenance, ScannerDetails, TextLocation,
    };
    use std::collections::BTreeSet;

    fn scancode() -> ScannerDetails {
        ScannerDetails {
            name: "ScanCode".into(),
            version: "32.0.0".into(),
            configuration: "--copyright --license".into(),
        }
    }

    /// One queued scanner run for a repository package in a subdirectory.
    async fn queued_scanner_run(store: &InMemoryJobStore) -> ScannerRunId {
        let run = queued_run(store, "").await;
        let descriptor =
            git_package("lib", "https://example.com/lib.git", "pkg/lib");
        let registration = store
            .register_discovered_package(run.id, &descriptor)
            .await
            .unwrap();
        let provenance = Provenance::for_package(&descriptor).unwrap();
        store
            .attach_or_create_scanner_run(registration.package_id, &provenance)
            .await
            .unwrap()
            .scanner_run_id
    }

    #[tokio::test]
    async fn scanner_failure_records_a_failure_summary() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(InMemoryJobStore::new());
        let id = queued_scanner_run(&store).await;

        let mut scanner = MockPackageScanner::new();
        scanner
            .expect_scan()
            .times(1)
            .returning(|_, _, _| {
                Err(anyhow::anyhow!("license database missing"))
            });
        scanner.expect_details().returning(scancode);

        let worker = ScannerWorker::new(
            store.clone(),
            Arc::new(scanner),
            ScannerWorkerSettings::under(dir.path()),
        );
        assert_eq!(worker.poll_once().await.unwrap(), PollOutcome::Processed);

        let run = store.get_scanner_run(id).await.unwrap().unwrap();
        assert_eq!(run.status, ScannerRunStatus::Failed);
        assert_eq!(run.scanner, Some(scancode()));

        let summary = run.summary.unwrap();
        assert_eq!(summary.file_count, 0);
        assert!(summary.license_findings.is_empty());
        assert!(summary.copyright_findings.is_empty());
        assert_eq!(summary.issues.len(), 1);
        assert_eq!(summary.issues[0].source, "ScanCode");
        assert_eq!(
            summary.issues[0].message,
            "Scan failed: license database missing"
        );
        assert_eq!(
            store.scanner_status_history(id).await,
            vec![
                ScannerRunStatus::Queued,
                ScannerRunStatus::Scanning,
                ScannerRunStatus::Failed,
            ]
        );
    }

    #[tokio::test]
    async fn successful_scan_stores_summary_and_scans_only_the_provenance() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(InMemoryJobStore::new());
        let id = queued_scanner_run(&store).await;
        let settings = ScannerWorkerSettings::under(dir.path());
        let expected_output = settings.output_dir(id);
        let expected_download = settings.download_dir(id);

        let now = Utc::now();
        let summary = ScanSummary {
            start_time: now,
            end_time: now,
            file_count: 12,
            package_verification_code: "abc".into(),
            license_findings: BTreeSet::from([LicenseFinding {
                license: "MIT".into(),
                location: TextLocation {
                    path: "LICENSE".into(),
                    start_line: 1,
                    end_line: 21,
                },
            }]),
            copyright_findings: BTreeSet::new(),
            issues: Vec::new(),
        };
        let returned = ScanOutcome {
            scanner: scancode(),
            summary: summary.clone(),
        };

        let mut scanner = MockPackageScanner::new();
        scanner
            .expect_scan()
            .withf(move |target, output_dir, download_dir| {
                target.id.name.is_empty()
                    && target.vcs.url == "https://example.com/lib.git"
                    && target.vcs.path.is_empty()
                    && output_dir == expected_output.as_path()
                    && download_dir == expected_download.as_path()
            })
            .times(1)
            .returning(move |_, _, _| Ok(returned.clone()));

        let worker =
            ScannerWorker::new(store.clone(), Arc::new(scanner), settings);
        worker.poll_once().await.unwrap();

        let run = store.get_scanner_run(id).await.unwrap().unwrap();
        assert_eq!(run.status, ScannerRunStatus::Success);
        assert_eq!(run.summary, Some(summary));
        assert!(dir.path().join("scan-output").join(id.to_string()).is_dir());
        assert_eq!(worker.poll_once().await.unwrap(), PollOutcome::Idle);
    }

    #[tokio::test]
    async fn storage_failure_on_claim_aborts_the_iteration() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = MockScannerRunStore::new();
        store
            .expect_claim_next_scanner_run()
            .times(1)
            .returning(|| {
                Err(PipelineError::Storage("connection reset".into()))
            });
        store.expect_finish_scanner_run().never();

        let worker = ScannerWorker::new(
            Arc::new(store),
            Arc::new(MockPackageScanner::new()),
            ScannerWorkerSettings::under(dir.path()),
        );
        let err = worker.poll_once().await.unwrap_err();
        assert!(err.is_storage());
    }
}
