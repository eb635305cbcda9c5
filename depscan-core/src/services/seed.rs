use depscan_model::{Project, RepositoryType};
use tracing::info;

use crate::database::ports::CatalogStore;
use crate::error::Result;

pub const EXAMPLE_PROJECT_NAME: &str = "ORT Test Projects";
pub const EXAMPLE_REPOSITORY_URL: &str =
    "https://github.com/oss-review-toolkit/ort.git";
pub const EXAMPLE_PATHS: [&str; 2] = [
    "analyzer/src/funTest/assets/projects/synthetic/gradle",
    "analyzer/src/funTest/assets/projects/synthetic/npm",
];

/// Create the demo project with two attachments of one repository, but only
/// into an empty catalog.
pub async fn seed_example_project(
    store: &dyn CatalogStore,
) -> Result<Option<Project>> {
    if !store.list_projects().await?.is_empty() {
        return Ok(None);
    }

    let project = store.create_project(EXAMPLE_PROJECT_NAME).await?;
    for path in EXAMPLE_PATHS {
        store
            .attach_repository(
                project.id,
                RepositoryType::Git,
                EXAMPLE_REPOSITORY_URL,
                path,
            )
            .await?;
    }
    info!(project = %project.id, "seeded example project");
    Ok(Some(project))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::InMemoryJobStore;

    #[tokio::test]
    async fn seeds_once_into_an_empty_catalog() {
        let store = InMemoryJobStore::new();

        let project = seed_example_project(&store).await.unwrap().unwrap();
        let attachments =
            store.list_project_repositories(project.id).await.unwrap();
        assert_eq!(attachments.len(), 2);
        assert_eq!(attachments[0].repository.id, attachments[1].repository.id);

        assert!(seed_example_project(&store).await.unwrap().is_none());
        assert_eq!(store.list_projects().await.unwrap().len(), 1);
    }
}
