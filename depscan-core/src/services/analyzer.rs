use depscan_model::{AnalyzerRun, AnalyzerRunId, PackageId, ProjectRepositoryId};
use std::{fmt, sync::Arc};
use tracing::info;

use super::dependency_tree::{DEFAULT_MAX_DEPTH, ProjectDependencyTree};
use crate::database::ports::CatalogStore;
use crate::error::{PipelineError, Result};

pub struct AnalyzerService {
    store: Arc<dyn CatalogStore>,
}

impl fmt::Debug for AnalyzerService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalyzerService")
            .field("store", &"Arc<dyn CatalogStore>")
            .finish()
    }
}

impl AnalyzerService {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    /// Queue an analysis of the attachment at `revision`. The analyzer worker
    /// picks it up on its next poll.
    pub async fn start_analyzer(
        &self,
        project_repository: ProjectRepositoryId,
        revision: &str,
    ) -> Result<AnalyzerRun> {
        let revision = revision.trim();
        if revision.is_empty() {
            return Err(PipelineError::InvalidInput(
                "revision must not be blank".into(),
            ));
        }

        if self
            .store
            .get_project_repository(project_repository)
            .await?
            .is_none()
        {
            return Err(PipelineError::NotFound(format!(
                "project repository {project_repository}"
            )));
        }

        let run = self
            .store
            .enqueue_analyzer_run(project_repository, revision, "")
            .await?;
        info!(
            analyzer_run = %run.id,
            %project_repository,
            revision,
            "queued analyzer run"
        );
        Ok(run)
    }

    pub async fn read_analyzer_run(
        &self,
        id: AnalyzerRunId,
    ) -> Result<AnalyzerRun> {
        self.store.get_analyzer_run(id).await?.ok_or_else(|| {
            PipelineError::NotFound(format!("analyzer run {id}"))
        })
    }

    /// Empty for an unknown attachment.
    pub async fn read_analyzer_runs_for_project_repository(
        &self,
        id: ProjectRepositoryId,
    ) -> Result<Vec<AnalyzerRun>> {
        self.store.list_analyzer_runs_for_project_repository(id).await
    }

    /// Empty for an unknown package.
    pub async fn read_analyzer_runs_for_package(
        &self,
        id: PackageId,
    ) -> Result<Vec<AnalyzerRun>> {
        self.store.list_analyzer_runs_for_package(id).await
    }

    /// One tree per analyzed project of a finished run.
    pub async fn read_dependency_tree(
        &self,
        id: AnalyzerRunId,
        max_depth: Option<usize>,
    ) -> Result<Vec<ProjectDependencyTree>> {
        let run = self.read_analyzer_run(id).await?;
        let result = run.result.ok_or_else(|| {
            PipelineError::NotFound(format!(
                "analyzer run {id} has no result ({})",
                run.status
            ))
        })?;

        let max_depth = max_depth.unwrap_or(DEFAULT_MAX_DEPTH);
        Ok(result
            .projects
            .iter()
            .map(|project| ProjectDependencyTree::build(project, max_depth))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{memory::InMemoryJobStore, ports::AnalyzerRunStore};
    use depscan_model::{
        AnalyzedProject, AnalyzerResult, AnalyzerRunStatus, Identifier,
        PackageReference, RepositoryType, Scope,
    };

    async fn attachment(store: &InMemoryJobStore) -> ProjectRepositoryId {
        let project = store.create_project("demo").await.unwrap();
        store
            .attach_repository(
                project.id,
                RepositoryType::Git,
                "https://example.com/r.git",
                "",
            )
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn start_analyzer_queues_a_run_with_empty_reference() {
        let store = Arc::new(InMemoryJobStore::new());
        let target = attachment(&store).await;
        let service = AnalyzerService::new(store.clone());

        let run = service.start_analyzer(target, " v2.1.0 ").await.unwrap();
        assert_eq!(run.status, AnalyzerRunStatus::Queued);
        assert_eq!(run.revision, "v2.1.0");
        assert_eq!(run.reference, "");
        assert_eq!(
            service
                .read_analyzer_runs_for_project_repository(target)
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn start_analyzer_validates_input() {
        let store = Arc::new(InMemoryJobStore::new());
        let target = attachment(&store).await;
        let service = AnalyzerService::new(store);

        assert!(matches!(
            service.start_analyzer(target, "  ").await,
            Err(PipelineError::InvalidInput(_))
        ));
        assert!(matches!(
            service.start_analyzer(ProjectRepositoryId::new(), "main").await,
            Err(PipelineError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn dependency_tree_needs_a_result() {
        let store = Arc::new(InMemoryJobStore::new());
        let target = attachment(&store).await;
        let service = AnalyzerService::new(store.clone());
        let run = service.start_analyzer(target, "main").await.unwrap();

        assert!(matches!(
            service.read_dependency_tree(run.id, None).await,
            Err(PipelineError::NotFound(_))
        ));

        let claim = store.claim_next_analyzer_run().await.unwrap().unwrap();
        store
            .advance_analyzer_run(
                claim.run.id,
                AnalyzerRunStatus::DownloadingSourceCode,
                AnalyzerRunStatus::AnalyzingDependencies,
            )
            .await
            .unwrap();
        let dep = Identifier::new("NPM", "", "left-pad", "1.3.0");
        let result = AnalyzerResult {
            projects: vec![AnalyzedProject {
                id: Identifier::new("NPM", "", "web", "0.1.0"),
                scopes: vec![Scope {
                    name: "dependencies".into(),
                    dependencies: vec![PackageReference {
                        id: dep.clone(),
                        ..PackageReference::default()
                    }],
                }],
                ..AnalyzedProject::default()
            }],
            ..AnalyzerResult::default()
        };
        store.complete_analyzer_run(run.id, &result).await.unwrap();

        let trees =
            service.read_dependency_tree(run.id, Some(4)).await.unwrap();
        assert_eq!(trees.len(), 1);
        assert_eq!(trees[0].scopes[0].dependencies[0].id, dep);
    }
}
