use depscan_model::{AnalyzerRunId, Package, PackageId, PackageOverview};
use std::{fmt, sync::Arc};

use crate::database::ports::CatalogStore;
use crate::error::{PipelineError, Result};

pub struct PackageService {
    store: Arc<dyn CatalogStore>,
}

impl fmt::Debug for PackageService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PackageService")
            .field("store", &"Arc<dyn CatalogStore>")
            .finish()
    }
}

impl PackageService {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    async fn overview(&self, package: &Package) -> Result<PackageOverview> {
        let runs = self.store.list_scanner_runs_for_package(package.id).await?;
        Ok(PackageOverview::new(package, runs.first()))
    }

    async fn overviews(
        &self,
        packages: Vec<Package>,
    ) -> Result<Vec<PackageOverview>> {
        let mut overviews = Vec::with_capacity(packages.len());
        for package in &packages {
            overviews.push(self.overview(package).await?);
        }
        Ok(overviews)
    }

    pub async fn read_packages(&self) -> Result<Vec<PackageOverview>> {
        let packages = self.store.list_packages().await?;
        self.overviews(packages).await
    }

    pub async fn read_packages_for_analyzer_run(
        &self,
        run: AnalyzerRunId,
    ) -> Result<Vec<PackageOverview>> {
        if self.store.get_analyzer_run(run).await?.is_none() {
            return Err(PipelineError::NotFound(format!("analyzer run {run}")));
        }
        let packages = self.store.list_packages_for_analyzer_run(run).await?;
        self.overviews(packages).await
    }

    pub async fn read_package(&self, id: PackageId) -> Result<Package> {
        self.store
            .get_package(id)
            .await?
            .ok_or_else(|| PipelineError::NotFound(format!("package {id}")))
    }
}
