use depscan_model::{Package, PackageId, ScanSummary, ScannerRun, ScannerRunId};
use std::{fmt, sync::Arc};

use crate::database::ports::CatalogStore;
use crate::error::{PipelineError, Result};

pub struct ScannerService {
    store: Arc<dyn CatalogStore>,
}

impl fmt::Debug for ScannerService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScannerService")
            .field("store", &"Arc<dyn CatalogStore>")
            .finish()
    }
}

impl ScannerService {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    pub async fn read_scanner_runs(&self) -> Result<Vec<ScannerRun>> {
        self.store.list_scanner_runs().await
    }

    /// Newest first; empty for an unknown package.
    pub async fn read_scanner_runs_for_package(
        &self,
        id: PackageId,
    ) -> Result<Vec<ScannerRun>> {
        self.store.list_scanner_runs_for_package(id).await
    }

    pub async fn read_scanner_run(
        &self,
        id: ScannerRunId,
    ) -> Result<ScannerRun> {
        self.store.get_scanner_run(id).await?.ok_or_else(|| {
            PipelineError::NotFound(format!("scanner run {id}"))
        })
    }

    pub async fn read_packages_for_scanner_run(
        &self,
        id: ScannerRunId,
    ) -> Result<Vec<Package>> {
        self.read_scanner_run(id).await?;
        self.store.list_packages_for_scanner_run(id).await
    }

    /// Fails with `NotFound` until the run has finished.
    pub async fn read_scan_summary(
        &self,
        id: ScannerRunId,
    ) -> Result<ScanSummary> {
        self.read_scanner_run(id).await?.summary.ok_or_else(|| {
            PipelineError::NotFound(format!("scan summary of scanner run {id}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{memory::InMemoryJobStore, ports::ScanJobStore};
    use depscan_model::{Provenance, RemoteArtifact};

    #[tokio::test]
    async fn summary_is_missing_until_the_scan_finishes() {
        let store = Arc::new(InMemoryJobStore::new());
        let service = ScannerService::new(store.clone());

        assert!(matches!(
            service.read_scan_summary(ScannerRunId::new()).await,
            Err(PipelineError::NotFound(_))
        ));

        let provenance = Provenance::Artifact {
            source_artifact: RemoteArtifact {
                url: "https://registry.example.com/a-1.0.tgz".into(),
                ..RemoteArtifact::default()
            },
        };
        let assignment = store
            .attach_or_create_scanner_run(PackageId::new(), &provenance)
            .await
            .unwrap();

        assert_eq!(service.read_scanner_runs().await.unwrap().len(), 1);
        assert!(matches!(
            service.read_scan_summary(assignment.scanner_run_id).await,
            Err(PipelineError::NotFound(_))
        ));
    }
}
