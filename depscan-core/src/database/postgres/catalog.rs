use async_trait::async_trait;
use depscan_model::{
    AnalyzerRun, AnalyzerRunId, Package, PackageId, Project, ProjectId,
    ProjectRepository, ProjectRepositoryId, RepositoryType, ScanJob,
    ScannerRun, ScannerRunId, StrandedWork,
};
use uuid::Uuid;

use super::{
    PostgresJobStore,
    rows::{
        self, ANALYZER_RUN_COLUMNS, PACKAGE_COLUMNS, PROJECT_REPOSITORY_COLUMNS,
        SCANNER_RUN_COLUMNS,
    },
};
use crate::database::ports::CatalogStore;
use crate::error::{PipelineError, Result};

impl PostgresJobStore {
    async fn fetch_project_repository(
        &self,
        id: Uuid,
    ) -> Result<Option<ProjectRepository>> {
        let query = format!(
            "SELECT {PROJECT_REPOSITORY_COLUMNS} \
             FROM project_repositories pr \
             JOIN repositories r ON r.id = pr.repository_id \
             WHERE pr.id = $1"
        );
        sqlx::query(&query)
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .as_ref()
            .map(rows::project_repository)
            .transpose()
    }
}

#[async_trait]
impl CatalogStore for PostgresJobStore {
    async fn create_project(&self, name: &str) -> Result<Project> {
        let row = sqlx::query(
            r#"
            INSERT INTO projects (id, name)
            VALUES ($1, $2)
            RETURNING id, name
            "#,
        )
        .bind(ProjectId::new().to_uuid())
        .bind(name)
        .fetch_one(self.pool())
        .await
        .map_err(|e| {
            PipelineError::Storage(format!("Failed to create project: {e}"))
        })?;
        rows::project(&row)
    }

    async fn list_projects(&self) -> Result<Vec<Project>> {
        sqlx::query("SELECT id, name FROM projects ORDER BY created_at, id")
            .fetch_all(self.pool())
            .await?
            .iter()
            .map(rows::project)
            .collect()
    }

    async fn get_project(&self, id: ProjectId) -> Result<Option<Project>> {
        sqlx::query("SELECT id, name FROM projects WHERE id = $1")
            .bind(id.to_uuid())
            .fetch_optional(self.pool())
            .await?
            .as_ref()
            .map(rows::project)
            .transpose()
    }

    async fn rename_project(
        &self,
        id: ProjectId,
        name: &str,
    ) -> Result<Option<Project>> {
        sqlx::query(
            "UPDATE projects SET name = $2 WHERE id = $1 RETURNING id, name",
        )
        .bind(id.to_uuid())
        .bind(name)
        .fetch_optional(self.pool())
        .await?
        .as_ref()
        .map(rows::project)
        .transpose()
    }

    async fn delete_project(&self, id: ProjectId) -> Result<bool> {
        let deleted = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id.to_uuid())
            .execute(self.pool())
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                    PipelineError::Conflict(format!(
                        "project {id} still has repositories attached"
                    ))
                }
                other => other.into(),
            })?;
        Ok(deleted.rows_affected() > 0)
    }

    async fn attach_repository(
        &self,
        project: ProjectId,
        repo_type: RepositoryType,
        url: &str,
        path: &str,
    ) -> Result<ProjectRepository> {
        let mut tx = self.pool().begin().await?;

        // The no-op update makes RETURNING yield the existing row as well.
        let repository_id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO repositories (id, repo_type, url)
            VALUES ($1, $2, $3)
            ON CONFLICT (repo_type, url) DO UPDATE SET url = EXCLUDED.url
            RETURNING id
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(repo_type.as_str())
        .bind(url)
        .fetch_one(&mut *tx)
        .await?;

        let id = ProjectRepositoryId::new();
        sqlx::query(
            r#"
            INSERT INTO project_repositories
                (id, project_id, repository_id, path)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(id.to_uuid())
        .bind(project.to_uuid())
        .bind(repository_id)
        .bind(path)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        self.fetch_project_repository(id.to_uuid()).await?.ok_or_else(|| {
            PipelineError::Storage(format!(
                "project repository {id} vanished after insert"
            ))
        })
    }

    async fn list_project_repositories(
        &self,
        project: ProjectId,
    ) -> Result<Vec<ProjectRepository>> {
        let query = format!(
            "SELECT {PROJECT_REPOSITORY_COLUMNS} \
             FROM project_repositories pr \
             JOIN repositories r ON r.id = pr.repository_id \
             WHERE pr.project_id = $1 \
             ORDER BY pr.id"
        );
        sqlx::query(&query)
            .bind(project.to_uuid())
            .fetch_all(self.pool())
            .await?
            .iter()
            .map(rows::project_repository)
            .collect()
    }

    async fn get_project_repository(
        &self,
        id: ProjectRepositoryId,
    ) -> Result<Option<ProjectRepository>> {
        self.fetch_project_repository(id.to_uuid()).await
    }

    async fn enqueue_analyzer_run(
        &self,
        project_repository: ProjectRepositoryId,
        revision: &str,
        reference: &str,
    ) -> Result<AnalyzerRun> {
        let query = format!(
            "INSERT INTO analyzer_runs AS ar \
                 (id, project_repository_id, revision, reference, status) \
             VALUES ($1, $2, $3, $4, 'QUEUED') \
             RETURNING {ANALYZER_RUN_COLUMNS}"
        );
        let row = sqlx::query(&query)
            .bind(AnalyzerRunId::new().to_uuid())
            .bind(project_repository.to_uuid())
            .bind(revision)
            .bind(reference)
            .fetch_one(self.pool())
            .await?;
        rows::analyzer_run(&row)
    }

    async fn get_analyzer_run(
        &self,
        id: AnalyzerRunId,
    ) -> Result<Option<AnalyzerRun>> {
        let query = format!(
            "SELECT {ANALYZER_RUN_COLUMNS} FROM analyzer_runs ar \
             WHERE ar.id = $1"
        );
        sqlx::query(&query)
            .bind(id.to_uuid())
            .fetch_optional(self.pool())
            .await?
            .as_ref()
            .map(rows::analyzer_run)
            .transpose()
    }

    async fn list_analyzer_runs_for_project_repository(
        &self,
        id: ProjectRepositoryId,
    ) -> Result<Vec<AnalyzerRun>> {
        let query = format!(
            "SELECT {ANALYZER_RUN_COLUMNS} FROM analyzer_runs ar \
             WHERE ar.project_repository_id = $1 \
             ORDER BY ar.created_at DESC, ar.id DESC"
        );
        sqlx::query(&query)
            .bind(id.to_uuid())
            .fetch_all(self.pool())
            .await?
            .iter()
            .map(rows::analyzer_run)
            .collect()
    }

    async fn list_analyzer_runs_for_package(
        &self,
        id: PackageId,
    ) -> Result<Vec<AnalyzerRun>> {
        let query = format!(
            "SELECT {ANALYZER_RUN_COLUMNS} FROM analyzer_runs ar \
             JOIN analyzer_runs_packages arp ON arp.analyzer_run_id = ar.id \
             WHERE arp.package_id = $1 \
             ORDER BY ar.created_at DESC, ar.id DESC"
        );
        sqlx::query(&query)
            .bind(id.to_uuid())
            .fetch_all(self.pool())
            .await?
            .iter()
            .map(rows::analyzer_run)
            .collect()
    }

    async fn list_packages(&self) -> Result<Vec<Package>> {
        let query = format!(
            "SELECT {PACKAGE_COLUMNS} FROM packages p \
             ORDER BY p.identifier, p.id"
        );
        sqlx::query(&query)
            .fetch_all(self.pool())
            .await?
            .iter()
            .map(rows::package)
            .collect()
    }

    async fn list_packages_for_analyzer_run(
        &self,
        id: AnalyzerRunId,
    ) -> Result<Vec<Package>> {
        let query = format!(
            "SELECT {PACKAGE_COLUMNS} FROM packages p \
             JOIN analyzer_runs_packages arp ON arp.package_id = p.id \
             WHERE arp.analyzer_run_id = $1 \
             ORDER BY p.identifier, p.id"
        );
        sqlx::query(&query)
            .bind(id.to_uuid())
            .fetch_all(self.pool())
            .await?
            .iter()
            .map(rows::package)
            .collect()
    }

    async fn get_package(&self, id: PackageId) -> Result<Option<Package>> {
        let query =
            format!("SELECT {PACKAGE_COLUMNS} FROM packages p WHERE p.id = $1");
        sqlx::query(&query)
            .bind(id.to_uuid())
            .fetch_optional(self.pool())
            .await?
            .as_ref()
            .map(rows::package)
            .transpose()
    }

    async fn list_scan_jobs(&self) -> Result<Vec<ScanJob>> {
        sqlx::query(
            r#"
            SELECT id, created_at, status, package_id
            FROM scan_jobs
            ORDER BY created_at, id
            "#,
        )
        .fetch_all(self.pool())
        .await?
        .iter()
        .map(rows::scan_job)
        .collect()
    }

    async fn list_scanner_runs(&self) -> Result<Vec<ScannerRun>> {
        let query = format!(
            "SELECT {SCANNER_RUN_COLUMNS} FROM scanner_runs sr \
             ORDER BY sr.created_at DESC, sr.id DESC"
        );
        sqlx::query(&query)
            .fetch_all(self.pool())
            .await?
            .iter()
            .map(rows::scanner_run)
            .collect()
    }

    async fn list_scanner_runs_for_package(
        &self,
        id: PackageId,
    ) -> Result<Vec<ScannerRun>> {
        let query = format!(
            "SELECT {SCANNER_RUN_COLUMNS} FROM scanner_runs sr \
             JOIN packages_scanner_runs psr ON psr.scanner_run_id = sr.id \
             WHERE psr.package_id = $1 \
             ORDER BY sr.created_at DESC, sr.id DESC"
        );
        sqlx::query(&query)
            .bind(id.to_uuid())
            .fetch_all(self.pool())
            .await?
            .iter()
            .map(rows::scanner_run)
            .collect()
    }

    async fn list_packages_for_scanner_run(
        &self,
        id: ScannerRunId,
    ) -> Result<Vec<Package>> {
        let query = format!(
            "SELECT {PACKAGE_COLUMNS} FROM packages p \
             JOIN packages_scanner_runs psr ON psr.package_id = p.id \
             WHERE psr.scanner_run_id = $1 \
             ORDER BY p.identifier, p.id"
        );
        sqlx::query(&query)
            .bind(id.to_uuid())
            .fetch_all(self.pool())
            .await?
            .iter()
            .map(rows::package)
            .collect()
    }

    async fn get_scanner_run(
        &self,
        id: ScannerRunId,
    ) -> Result<Option<ScannerRun>> {
        let query = format!(
            "SELECT {SCANNER_RUN_COLUMNS} FROM scanner_runs sr WHERE sr.id = $1"
        );
        sqlx::query(&query)
            .bind(id.to_uuid())
            .fetch_optional(self.pool())
            .await?
            .as_ref()
            .map(rows::scanner_run)
            .transpose()
    }

    async fn stranded_work(&self) -> Result<StrandedWork> {
        let (analyzer_runs, scan_jobs, scanner_runs): (i64, i64, i64) =
            sqlx::query_as(
                r#"
                SELECT
                    (SELECT COUNT(*) FROM analyzer_runs
                     WHERE status IN (
                         'DOWNLOADING_SOURCE_CODE',
                         'ANALYZING_DEPENDENCIES'
                     )),
                    (SELECT COUNT(*) FROM scan_jobs
                     WHERE status = 'IN_PROGRESS'),
                    (SELECT COUNT(*) FROM scanner_runs
                     WHERE status = 'SCANNING')
                "#,
            )
            .fetch_one(self.pool())
            .await?;

        Ok(StrandedWork {
            analyzer_runs: analyzer_runs.max(0) as u64,
            scan_jobs: scan_jobs.max(0) as u64,
            scanner_runs: scanner_runs.max(0) as u64,
        })
    }
}
