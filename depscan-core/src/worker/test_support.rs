use depscan_model::{
    AnalyzerRun, Identifier, PackageDescriptor, RemoteArtifact, RepositoryType,
    VcsInfo, VcsType,
};

use crate::database::{memory::InMemoryJobStore, ports::CatalogStore};

pub(crate) const REPO_URL: &str = "https://example.com/repo.git";

/// A project with one Git attachment and a `QUEUED` run at `main`.
pub(crate) async fn queued_run(
    store: &InMemoryJobStore,
    path: &str,
) -> AnalyzerRun {
    let project = store.create_project("demo").await.unwrap();
    let attachment = store
        .attach_repository(project.id, RepositoryType::Git, REPO_URL, path)
        .await
        .unwrap();
    store
        .enqueue_analyzer_run(attachment.id, "main", "")
        .await
        .unwrap()
}

pub(crate) fn bare_package(name: &str) -> PackageDescriptor {
    PackageDescriptor::new(Identifier::new("NPM", "", name, "1.0.0"))
}

pub(crate) fn git_package(
    name: &str,
    url: &str,
    path: &str,
) -> PackageDescriptor {
    let mut pkg = bare_package(name);
    pkg.vcs = VcsInfo {
        vcs_type: VcsType::Git,
        url: url.into(),
        revision: "v1.0.0".into(),
        resolved_revision: None,
        path: path.into(),
    };
    pkg
}

pub(crate) fn artifact_package(name: &str) -> PackageDescriptor {
    let mut pkg = bare_package(name);
    pkg.source_artifact = RemoteArtifact {
        url: format!("https://registry.example.com/{name}-1.0.0.tgz"),
        ..RemoteArtifact::default()
    };
    pkg
}
