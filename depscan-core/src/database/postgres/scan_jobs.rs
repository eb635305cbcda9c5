use async_trait::async_trait;
use depscan_model::{
    PackageId, Provenance, ScanJobClaim, ScanJobId, ScannerRunId,
};
use sqlx::types::Json;
use uuid::Uuid;

use super::{
    PostgresJobStore,
    rows::{self, PACKAGE_COLUMNS},
};
use crate::database::ports::{ScanJobStore, ScannerRunAssignment};
use crate::error::{PipelineError, Result};

#[async_trait]
impl ScanJobStore for PostgresJobStore {
    async fn claim_next_scan_job(&self) -> Result<Option<ScanJobClaim>> {
        let mut tx = self.pool().begin().await.map_err(|e| {
            PipelineError::Storage(format!("begin claim tx failed: {e}"))
        })?;

        let picked: Option<Uuid> = sqlx::query_scalar(
            r#"
            SELECT id
            FROM scan_jobs
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

        let job_row = sqlx::query(
            r#"
            UPDATE scan_jobs
            SET status = 'IN_PROGRESS'
            WHERE id = $1 AND status = 'QUEUED'
            RETURNING id, created_at, status, package_id
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(job_row) = job_row else {
            return Ok(None);
        };
        let job = rows::scan_job(&job_row)?;

        let query =
            format!("SELECT {PACKAGE_COLUMNS} FROM packages p WHERE p.id = $1");
        let package_row = sqlx::query(&query)
            .bind(job.package_id.to_uuid())
            .fetch_one(&mut *tx)
            .await?;
        let package = rows::package(&package_row)?;

        tx.commit().await.map_err(|e| {
            PipelineError::Storage(format!("commit claim tx failed: {e}"))
        })?;

        Ok(Some(ScanJobClaim { job, package }))
    }

    async fn attach_or_create_scanner_run(
        &self,
        package: PackageId,
        provenance: &Provenance,
    ) -> Result<ScannerRunAssignment> {
        let mut tx = self.pool().begin().await?;

        let inserted: Option<Uuid> = sqlx::query_scalar(
            r#"
            INSERT INTO scanner_runs (id, provenance, status)
            VALUES ($1, $2, 'QUEUED')
            ON CONFLICT (provenance) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(Json(provenance))
        .fetch_optional(&mut *tx)
        .await?;

        let (run_id, created) = match inserted {
            Some(id) => (id, true),
            None => {
                let id: Uuid = sqlx::query_scalar(
                    "SELECT id FROM scanner_runs WHERE provenance = $1::jsonb",
                )
                .bind(Json(provenance))
                .fetch_one(&mut *tx)
                .await?;
                (id, false)
            }
        };

        let linked = sqlx::query(
            r#"
            INSERT INTO packages_scanner_runs (package_id, scanner_run_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(package.to_uuid())
        .bind(run_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(ScannerRunAssignment {
            scanner_run_id: ScannerRunId::from(run_id),
            created,
            attached: linked.rows_affected() == 1,
        })
    }

    async fn delete_scan_job(&self, id: ScanJobId) -> Result<()> {
        sqlx::query("DELETE FROM scan_jobs WHERE id = $1")
            .bind(id.to_uuid())
            .execute(self.pool())
            .await?;
        Ok(())
    }
}
