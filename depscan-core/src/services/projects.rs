use depscan_model::{Project, ProjectId, ProjectRepository, RepositoryType};
use std::{fmt, sync::Arc};
use tracing::info;
use url::Url;

use crate::database::ports::CatalogStore;
use crate::error::{PipelineError, Result};

pub struct ProjectService {
    store: Arc<dyn CatalogStore>,
}

impl fmt::Debug for ProjectService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProjectService")
            .field("store", &"Arc<dyn CatalogStore>")
            .finish()
    }
}

fn project_name(name: &str) -> Result<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(PipelineError::InvalidInput(
            "project name must not be blank".into(),
        ));
    }
    Ok(name)
}

/// Accepts absolute URLs and scp-style `user@host:path` remotes.
fn repository_url(url: &str) -> Result<&str> {
    let url = url.trim();
    if Url::parse(url).is_ok() {
        return Ok(url);
    }
    if let Some((user_host, path)) = url.split_once(':')
        && user_host.contains('@')
        && !path.is_empty()
        && !user_host.contains('/')
    {
        return Ok(url);
    }
    Err(PipelineError::InvalidInput(format!(
        "'{url}' is not a valid repository URL"
    )))
}

impl ProjectService {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    pub async fn create_project(&self, name: &str) -> Result<Project> {
        let project = self.store.create_project(project_name(name)?).await?;
        info!(project = %project.id, name = %project.name, "created project");
        Ok(project)
    }

    pub async fn read_projects(&self) -> Result<Vec<Project>> {
        self.store.list_projects().await
    }

    pub async fn read_project(&self, id: ProjectId) -> Result<Project> {
        self.store
            .get_project(id)
            .await?
            .ok_or_else(|| PipelineError::NotFound(format!("project {id}")))
    }

    pub async fn update_project(
        &self,
        id: ProjectId,
        name: &str,
    ) -> Result<Project> {
        self.store
            .rename_project(id, project_name(name)?)
            .await?
            .ok_or_else(|| PipelineError::NotFound(format!("project {id}")))
    }

    /// Refused while repositories are still attached.
    pub async fn delete_project(&self, id: ProjectId) -> Result<()> {
        if !self.store.delete_project(id).await? {
            return Err(PipelineError::NotFound(format!("project {id}")));
        }
        info!(project = %id, "deleted project");
        Ok(())
    }

    pub async fn add_repository(
        &self,
        project: ProjectId,
        repo_type: RepositoryType,
        url: &str,
        path: &str,
    ) -> Result<ProjectRepository> {
        let url = repository_url(url)?;
        let path = path.trim().trim_matches('/');
        let attachment = self
            .store
            .attach_repository(project, repo_type, url, path)
            .await?;
        info!(
            project = %project,
            project_repository = %attachment.id,
            url,
            path,
            "attached repository"
        );
        Ok(attachment)
    }

    pub async fn read_repositories(
        &self,
        project: ProjectId,
    ) -> Result<Vec<ProjectRepository>> {
        self.read_project(project).await?;
        self.store.list_project_repositories(project).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::InMemoryJobStore;

    fn service() -> ProjectService {
        ProjectService::new(Arc::new(InMemoryJobStore::new()))
    }

    #[tokio::test]
    async fn blank_names_are_rejected() {
        let err = service().create_project("   ").await.unwrap_err();
        assert!(matches!(err, PipelineError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn rename_and_delete_unknown_project() {
        let service = service();
        let missing = ProjectId::new();
        assert!(matches!(
            service.update_project(missing, "x").await,
            Err(PipelineError::NotFound(_))
        ));
        assert!(matches!(
            service.delete_project(missing).await,
            Err(PipelineError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn repository_paths_are_trimmed() {
        let service = service();
        let project = service.create_project(" demo ").await.unwrap();
        assert_eq!(project.name, "demo");

        let attachment = service
            .add_repository(
                project.id,
                RepositoryType::Git,
                "https://example.com/repo.git",
                "/sub/dir/",
            )
            .await
            .unwrap();
        assert_eq!(attachment.path, "sub/dir");
        assert_eq!(
            service.read_repositories(project.id).await.unwrap().len(),
            1
        );
    }

    #[test]
    fn scp_style_remotes_are_accepted() {
        assert!(repository_url("git@github.com:org/repo.git").is_ok());
        assert!(repository_url("https://github.com/org/repo.git").is_ok());
        assert!(repository_url("not a url").is_err());
        assert!(repository_url("").is_err());
    }

    #[tokio::test]
    async fn project_with_attachments_cannot_be_deleted() {
        let service = service();
        let project = service.create_project("demo").await.unwrap();
        service
            .add_repository(
                project.id,
                RepositoryType::Git,
                "https://example.com/r.git",
                "",
            )
            .await
            .unwrap();
        assert!(matches!(
            service.delete_project(project.id).await,
            Err(PipelineError::Conflict(_))
        ));
    }
}
