use async_trait::async_trait;
use depscan_model::{
    AnalyzerResult, AnalyzerRunClaim, AnalyzerRunId, AnalyzerRunStatus,
    PackageDescriptor, ScanJobId,
};
use sqlx::types::Json;
use uuid::Uuid;

use super::{
    PostgresJobStore,
    rows::{self, ANALYZER_RUN_COLUMNS, PROJECT_REPOSITORY_COLUMNS},
};
use crate::database::{
    descriptor_digest,
    ports::{AnalyzerRunStore, PackageRegistration},
};
use crate::error::{PipelineError, Result};

fn transition_guard(
    id: AnalyzerRunId,
    from: AnalyzerRunStatus,
    to: AnalyzerRunStatus,
) -> Result<()> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(PipelineError::InvalidInput(format!(
            "analyzer run {id} cannot move from {from} to {to}"
        )))
    }
}

fn conflict(id: AnalyzerRunId, expected: AnalyzerRunStatus) -> PipelineError {
    PipelineError::ClaimConflict {
        entity: "analyzer run",
        id: id.to_uuid(),
        expected: expected.as_str(),
    }
}

#[async_trait]
impl AnalyzerRunStore for PostgresJobStore {
    async fn claim_next_analyzer_run(
        &self,
    ) -> Result<Option<AnalyzerRunClaim>> {
        let mut tx = self.pool().begin().await.map_err(|e| {
            PipelineError::Storage(format!("begin claim tx failed: {e}"))
        })?;

        let picked: Option<Uuid> = sqlx::query_scalar(
            r#"
            SELECT id
            FROM analyzer_runs
            WHERE status = 'QUEUED'
            ORDER BY created_at, id
            LIMIT 1
            FOR UPDATE SKIP LOCKED
            "#,
        )
        .fetch_optional(&mut *tx)
        .await?;

        let Some(id) = picked else {
            return Ok(None);
        };

        let updated = sqlx::query(
            r#"
            UPDATE analyzer_runs
            SET status = 'DOWNLOADING_SOURCE_CODE'
            WHERE id = $1 AND status = 'QUEUED'
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            // Raced with another status change; treat as empty
            return Ok(None);
        }

        let query = format!(
            "SELECT {ANALYZER_RUN_COLUMNS}, {PROJECT_REPOSITORY_COLUMNS} \
             FROM analyzer_runs ar \
             JOIN project_repositories pr ON pr.id = ar.project_repository_id \
             JOIN repositories r ON r.id = pr.repository_id \
             WHERE ar.id = $1"
        );
        let row = sqlx::query(&query).bind(id).fetch_one(&mut *tx).await?;
        let claim = AnalyzerRunClaim {
            run: rows::analyzer_run(&row)?,
            project_repository: rows::project_repository(&row)?,
        };

        tx.commit().await.map_err(|e| {
            PipelineError::Storage(format!("commit claim tx failed: {e}"))
        })?;

        Ok(Some(claim))
    }

    async fn advance_analyzer_run(
        &self,
        id: AnalyzerRunId,
        from: AnalyzerRunStatus,
        to: AnalyzerRunStatus,
    ) -> Result<()> {
        transition_guard(id, from, to)?;

        let updated = sqlx::query(
            r#"
            UPDATE analyzer_runs
            SET status = $3
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(id.to_uuid())
        .bind(from.as_str())
        .bind(to.as_str())
        .execute(self.pool())
        .await?;

        if updated.rows_affected() == 0 {
            return Err(conflict(id, from));
        }
        Ok(())
    }

    async fn fail_analyzer_run(
        &self,
        id: AnalyzerRunId,
        from: AnalyzerRunStatus,
        message: &str,
    ) -> Result<()> {
        transition_guard(id, from, AnalyzerRunStatus::Failed)?;

        let updated = sqlx::query(
            r#"
            UPDATE analyzer_runs
            SET status = 'FAILED', failure_message = $3
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(id.to_uuid())
        .bind(from.as_str())
        .bind(message)
        .execute(self.pool())
        .await?;

        if updated.rows_affected() == 0 {
            return Err(conflict(id, from));
        }
        Ok(())
    }

    async fn complete_analyzer_run(
        &self,
        id: AnalyzerRunId,
        result: &AnalyzerResult,
    ) -> Result<()> {
        let updated = sqlx::query(
            r#"
            UPDATE analyzer_runs
            SET status = 'SUCCESS', result = $2
            WHERE id = $1 AND status = 'ANALYZING_DEPENDENCIES'
            "#,
        )
        .bind(id.to_uuid())
        .bind(Json(result))
        .execute(self.pool())
        .await?;

        if updated.rows_affected() == 0 {
            return Err(conflict(id, AnalyzerRunStatus::AnalyzingDependencies));
        }
        Ok(())
    }

    async fn register_discovered_package(
        &self,
        run: AnalyzerRunId,
        descriptor: &PackageDescriptor,
    ) -> Result<PackageRegistration> {
        let digest = descriptor_digest(descriptor)?;
        let mut tx = self.pool().begin().await?;

        let inserted: Option<Uuid> = sqlx::query_scalar(
            r#"
            INSERT INTO packages (id, identifier, descriptor, descriptor_digest)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (descriptor_digest) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(descriptor.id.to_coordinates())
        .bind(Json(descriptor))
        .bind(&digest)
        .fetch_optional(&mut *tx)
        .await?;

        let (package_id, created) = match inserted {
            Some(id) => (id, true),
            None => {
                let id: Uuid = sqlx::query_scalar(
                    "SELECT id FROM packages WHERE descriptor_digest = $1",
                )
                .bind(&digest)
                .fetch_one(&mut *tx)
                .await?;
                (id, false)
            }
        };

        sqlx::query(
            r#"
            INSERT INTO analyzer_runs_packages (analyzer_run_id, package_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(run.to_uuid())
        .bind(package_id)
        .execute(&mut *tx)
        .await?;

        let scanned: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM packages_scanner_runs WHERE package_id = $1
            )
            "#,
        )
        .bind(package_id)
        .fetch_one(&mut *tx)
        .await?;

        let scan_job_id = if scanned {
            None
        } else {
            let job = ScanJobId::new();
            sqlx::query(
                r#"
                INSERT INTO scan_jobs (id, status, package_id)
                VALUES ($1, 'QUEUED', $2)
                "#,
            )
            .bind(job.to_uuid())
            .bind(package_id)
            .execute(&mut *tx)
            .await?;
            Some(job)
        };

        tx.commit().await?;

        Ok(PackageRegistration {
            package_id: package_id.into(),
            created,
            scan_job_id,
        })
    }
}
