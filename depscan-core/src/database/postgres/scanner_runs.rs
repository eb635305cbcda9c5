use async_trait::async_trait;
use depscan_model::{
    ScanSummary, ScannerDetails, ScannerRun, ScannerRunId, ScannerRunStatus,
};
use sqlx::types::Json;
use uuid::Uuid;

use super::{
    PostgresJobStore,
    rows::{self, SCANNER_RUN_COLUMNS},
};
use crate::database::ports::ScannerRunStore;
use crate::error::{PipelineError, Result};

#[async_trait]
impl ScannerRunStore for PostgresJobStore {
    async fn claim_next_scanner_run(&self) -> Result<Option<ScannerRun>> {
        let mut tx = self.pool().begin().await.map_err(|e| {
            PipelineError::Storage(format!("begin claim tx failed: {e}"))
        })?;

        let picked: Option<Uuid> = sqlx::query_scalar(
            r#"
            SELECT id
            FROM scanner_runs
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

        let query = format!(
            "UPDATE scanner_runs sr SET status = 'SCANNING' \
             WHERE sr.id = $1 AND sr.status = 'QUEUED' \
             RETURNING {SCANNER_RUN_COLUMNS}"
        );
        let row = sqlx::query(&query).bind(id).fetch_optional(&mut *tx).await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let run = rows::scanner_run(&row)?;

        tx.commit().await.map_err(|e| {
            PipelineError::Storage(format!("commit claim tx failed: {e}"))
        })?;

        Ok(Some(run))
    }

    async fn finish_scanner_run(
        &self,
        id: ScannerRunId,
        status: ScannerRunStatus,
        scanner: &ScannerDetails,
        summary: &ScanSummary,
    ) -> Result<()> {
        if !ScannerRunStatus::Scanning.can_transition_to(status) {
            return Err(PipelineError::InvalidInput(format!(
                "scanner run {id} cannot finish as {status}"
            )));
        }

        let updated = sqlx::query(
            r#"
            UPDATE scanner_runs
            SET status = $2, scanner = $3, summary = $4
            WHERE id = $1 AND status = 'SCANNING'
            "#,
        )
        .bind(id.to_uuid())
        .bind(status.as_str())
        .bind(Json(scanner))
        .bind(Json(summary))
        .execute(self.pool())
        .await?;

        if updated.rows_affected() == 0 {
            return Err(PipelineError::ClaimConflict {
                entity: "scanner run",
                id: id.to_uuid(),
                expected: ScannerRunStatus::Scanning.as_str(),
            });
        }
        Ok(())
    }
}
