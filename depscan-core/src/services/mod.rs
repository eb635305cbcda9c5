//! Catalog operations behind the HTTP API.
//!
//! Services only read and enqueue; status progression belongs to the
//! workers.

pub mod analyzer;
pub mod dependency_tree;
pub mod packages;
pub mod projects;
pub mod scanner;
pub mod seed;

use std::sync::Arc;

use crate::database::ports::CatalogStore;

pub use analyzer::AnalyzerService;
pub use dependency_tree::{
    DEFAULT_MAX_DEPTH, DependencyNode, ProjectDependencyTree, ScopeTree,
};
pub use packages::PackageService;
pub use projects::ProjectService;
pub use scanner::ScannerService;
pub use seed::seed_example_project;

/// The full set of services sharing one store.
#[derive(Debug, Clone)]
pub struct CatalogServices {
    pub projects: Arc<ProjectService>,
    pub analyzer: Arc<AnalyzerService>,
    pub packages: Arc<PackageService>,
    pub scanner: Arc<ScannerService>,
}

impl CatalogServices {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self {
            projects: Arc::new(ProjectService::new(store.clone())),
            analyzer: Arc::new(AnalyzerService::new(store.clone())),
            packages: Arc::new(PackageService::new(store.clone())),
            scanner: Arc::new(ScannerService::new(store)),
        }
    }
}
