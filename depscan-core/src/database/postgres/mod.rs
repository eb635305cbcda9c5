//! PostgreSQL implementation of the job store ports.

mod analyzer_runs;
mod catalog;
pub(crate) mod rows;
mod scan_jobs;
mod scanner_runs;

use sqlx::{PgPool, postgres::PgPoolOptions};
use std::{fmt, time::Duration};
use tracing::info;

use crate::error::{PipelineError, Result};

#[derive(Clone)]
pub struct PostgresJobStore {
    pool: PgPool,
}

impl fmt::Debug for PostgresJobStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresJobStore")
            .field("pool_size", &self.pool.size())
            .field("idle_connections", &self.pool.num_idle())
            .finish()
    }
}

impl PostgresJobStore {
    /// Open a pool and verify the server answers.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(30))
            .test_before_acquire(true)
            .connect(url)
            .await
            .map_err(|e| {
                PipelineError::Storage(format!(
                    "Database connection failed: {e}"
                ))
            })?;

        let store = Self::from_pool(pool);
        store.health_check().await?;
        info!(max_connections, "Job store connected to Postgres");
        Ok(store)
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                PipelineError::Storage(format!(
                    "Job store failed Postgres health check: {e}"
                ))
            })?;
        Ok(())
    }

    pub async fn run_migrations(&self) -> Result<()> {
        crate::MIGRATOR.run(&self.pool).await.map_err(|e| {
            PipelineError::Storage(format!("Migration failed: {e}"))
        })?;
        info!("Database migrations applied");
        Ok(())
    }
}
