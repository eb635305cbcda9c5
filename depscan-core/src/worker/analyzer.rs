use async_trait::async_trait;
use depscan_model::{
    AnalyzerConfig, AnalyzerResult, AnalyzerRunClaim, AnalyzerRunId,
    AnalyzerRunStatus,
};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::fs;
use tracing::{debug, info, warn};

use super::{PipelineWorker, PollOutcome};
use crate::adapters::{DependencyAnalyzer, SourceFetcher};
use crate::database::ports::AnalyzerRunStore;
use crate::error::{PipelineError, Result};

#[derive(Debug, Clone)]
pub struct AnalyzerWorkerSettings {
    /// Each run downloads into `<download_root>/<run id>`.
    pub download_root: PathBuf,
    pub backends: Vec<String>,
    pub config: AnalyzerConfig,
    pub allow_moving_revision: bool,
}

impl AnalyzerWorkerSettings {
    pub fn new(download_root: impl Into<PathBuf>) -> Self {
        Self {
            download_root: download_root.into(),
            backends: vec!["NPM".into(), "Gradle".into(), "Maven".into()],
            config: AnalyzerConfig::default(),
            allow_moving_revision: true,
        }
    }

    pub fn download_dir(&self, run: AnalyzerRunId) -> PathBuf {
        self.download_root.join(run.to_string())
    }
}

/// Drives analyzer runs from `QUEUED` to a terminal status and fans the
/// discovered packages out into scan jobs.
pub struct AnalyzerWorker {
    store: Arc<dyn AnalyzerRunStore>,
    fetcher: Arc<dyn SourceFetcher>,
    analyzer: Arc<dyn DependencyAnalyzer>,
    settings: AnalyzerWorkerSettings,
}

impl std::fmt::Debug for AnalyzerWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalyzerWorker")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl AnalyzerWorker {
    pub fn new(
        store: Arc<dyn AnalyzerRunStore>,
        fetcher: Arc<dyn SourceFetcher>,
        analyzer: Arc<dyn DependencyAnalyzer>,
        settings: AnalyzerWorkerSettings,
    ) -> Self {
        Self {
            store,
            fetcher,
            analyzer,
            settings,
        }
    }

    async fn download(&self, claim: &AnalyzerRunClaim) -> Result<PathBuf> {
        let run = &claim.run;
        info!(
            analyzer_run = %run.id,
            revision = %run.revision,
            "starting download"
        );

        let dir = self.settings.download_dir(run.id);
        let occupied = fs::try_exists(&dir).await.map_err(|e| {
            PipelineError::Acquisition(format!(
                "Cannot inspect download directory {}: {e}",
                dir.display()
            ))
        })?;
        if occupied {
            let shown =
                std::path::absolute(&dir).unwrap_or_else(|_| dir.clone());
            return Err(PipelineError::Acquisition(format!(
                "Download directory {} already exists.",
                shown.display()
            )));
        }

        fs::create_dir_all(&dir).await.map_err(|e| {
            PipelineError::Acquisition(format!(
                "Cannot create download directory {}: {e}",
                dir.display()
            ))
        })?;

        let locator = claim
            .project_repository
            .vcs_info(&run.revision)
            .normalized();
        self.fetcher
            .fetch(&locator, &dir, self.settings.allow_moving_revision)
            .await
            .map_err(|e| PipelineError::Acquisition(format!("{e:#}")))?;

        info!(
            analyzer_run = %run.id,
            dir = %dir.display(),
            "finished download"
        );
        Ok(dir)
    }

    async fn analyze(
        &self,
        run: AnalyzerRunId,
        source_dir: &Path,
    ) -> Result<AnalyzerResult> {
        info!(
            analyzer_run = %run,
            backends = ?self.settings.backends,
            "starting analysis"
        );
        match self
            .analyzer
            .analyze(source_dir, &self.settings.backends, &self.settings.config)
            .await
        {
            Ok(Some(result)) => Ok(result),
            Ok(None) => Err(PipelineError::Analysis(
                "The analyzer did not produce a result.".to_string(),
            )),
            Err(e) => Err(PipelineError::Analysis(format!("{e:#}"))),
        }
    }

    /// Register every discovered project and package and queue scan jobs for
    /// the ones never scanned before.
    async fn schedule_scans(
        &self,
        run: AnalyzerRunId,
        result: &AnalyzerResult,
    ) -> Result<usize> {
        let mut queued = 0;
        for descriptor in result.discovered_packages() {
            let registration = self
                .store
                .register_discovered_package(run, &descriptor)
                .await?;
            debug!(
                analyzer_run = %run,
                package = %descriptor.id,
                created = registration.created,
                queued = registration.scan_job_id.is_some(),
                "registered package"
            );
            if registration.scan_job_id.is_some() {
                queued += 1;
            }
        }
        Ok(queued)
    }

    async fn record_failure(
        &self,
        run: AnalyzerRunId,
        stage: AnalyzerRunStatus,
        err: PipelineError,
    ) -> Result<PollOutcome> {
        if err.is_storage() {
            return Err(err);
        }
        warn!(
            analyzer_run = %run,
            status = %stage,
            error = %err,
            "analyzer run failed"
        );
        self.store
            .fail_analyzer_run(run, stage, &err.to_string())
            .await?;
        Ok(PollOutcome::Processed)
    }
}

#[async_trait]
impl PipelineWorker for AnalyzerWorker {
    fn name(&self) -> &'static str {
        "analyzer"
    }

    async fn poll_once(&self) -> Result<PollOutcome> {
        debug!("searching for queued analyzer run");
        let Some(claim) = self.store.claim_next_analyzer_run().await? else {
            debug!("no queued analyzer run found");
            return Ok(PollOutcome::Idle);
        };
        let run = claim.run.id;

        let source_dir = match self.download(&claim).await {
            Ok(dir) => dir,
            Err(err) => {
                return self
                    .record_failure(
                        run,
                        AnalyzerRunStatus::DownloadingSourceCode,
                        err,
                    )
                    .await;
            }
        };

        self.store
            .advance_analyzer_run(
                run,
                AnalyzerRunStatus::DownloadingSourceCode,
                AnalyzerRunStatus::AnalyzingDependencies,
            )
            .await?;

        let result = match self.analyze(run, &source_dir).await {
            Ok(result) => result,
            Err(err) => {
                return self
                    .record_failure(
                        run,
                        AnalyzerRunStatus::AnalyzingDependencies,
                        err,
                    )
                    .await;
            }
        };

        self.store.complete_analyzer_run(run, &result).await?;
        info!(
            analyzer_run = %run,
            projects = result.projects.len(),
            packages = result.packages.len(),
            "finished analysis"
        );

        let queued = self.schedule_scans(run, &result).await?;
        info!(analyzer_run = %run, scan_jobs = queued, "scheduled scans");
        Ok(PollOutcome::Processed)
    }
}
