//! Row decoding shared by the Postgres repositories.

use chrono::{DateTime, Utc};
use depscan_model::{
    AnalyzerResult, AnalyzerRun, AnalyzerRunStatus, ModelError, Package,
    PackageDescriptor, Project, ProjectRepository, Provenance, Repository,
    RepositoryType, ScanJob, ScanJobStatus, ScanSummary, ScannerDetails,
    ScannerRun, ScannerRunStatus,
};
use sqlx::{Row, postgres::PgRow, types::Json};
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{PipelineError, Result};

pub(crate) const ANALYZER_RUN_COLUMNS: &str =
    "ar.id, ar.project_repository_id, ar.created_at, ar.revision, \
     ar.reference, ar.status, ar.result, ar.failure_message";

pub(crate) const PROJECT_REPOSITORY_COLUMNS: &str =
    "pr.id AS pr_id, pr.project_id, pr.path, r.id AS repository_id, \
     r.repo_type, r.url";

pub(crate) const PACKAGE_COLUMNS: &str =
    "p.id, p.created_at, p.descriptor";

pub(crate) const SCANNER_RUN_COLUMNS: &str =
    "sr.id, sr.created_at, sr.provenance, sr.status, sr.scanner, sr.summary";

fn column<'r, T>(row: &'r PgRow, name: &str) -> Result<T>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get(name).map_err(|e| {
        PipelineError::Storage(format!("Failed to read column {name}: {e}"))
    })
}

fn decode<T>(raw: &str) -> Result<T>
where
    T: FromStr<Err = ModelError>,
{
    Ok(raw.parse::<T>()?)
}

pub(crate) fn project(row: &PgRow) -> Result<Project> {
    Ok(Project {
        id: column::<Uuid>(row, "id")?.into(),
        name: column(row, "name")?,
    })
}

pub(crate) fn project_repository(row: &PgRow) -> Result<ProjectRepository> {
    let repo_type: String = column(row, "repo_type")?;
    Ok(ProjectRepository {
        id: column::<Uuid>(row, "pr_id")?.into(),
        project_id: column::<Uuid>(row, "project_id")?.into(),
        path: column(row, "path")?,
        repository: Repository {
            id: column::<Uuid>(row, "repository_id")?.into(),
            repo_type: decode::<RepositoryType>(&repo_type)?,
            url: column(row, "url")?,
        },
    })
}

pub(crate) fn analyzer_run(row: &PgRow) -> Result<AnalyzerRun> {
    let status: String = column(row, "status")?;
    let result: Option<Json<AnalyzerResult>> = column(row, "result")?;
    Ok(AnalyzerRun {
        id: column::<Uuid>(row, "id")?.into(),
        project_repository_id: column::<Uuid>(row, "project_repository_id")?
            .into(),
        created_at: column::<DateTime<Utc>>(row, "created_at")?,
        revision: column(row, "revision")?,
        reference: column(row, "reference")?,
        status: decode::<AnalyzerRunStatus>(&status)?,
        result: result.map(|Json(result)| result),
        failure_message: column(row, "failure_message")?,
    })
}

pub(crate) fn package(row: &PgRow) -> Result<Package> {
    let Json(descriptor): Json<PackageDescriptor> = column(row, "descriptor")?;
    Ok(Package {
        id: column::<Uuid>(row, "id")?.into(),
        created_at: column(row, "created_at")?,
        descriptor,
    })
}

pub(crate) fn scan_job(row: &PgRow) -> Result<ScanJob> {
    let status: String = column(row, "status")?;
    Ok(ScanJob {
        id: column::<Uuid>(row, "id")?.into(),
        created_at: column(row, "created_at")?,
        status: decode::<ScanJobStatus>(&status)?,
        package_id: column::<Uuid>(row, "package_id")?.into(),
    })
}

pub(crate) fn scanner_run(row: &PgRow) -> Result<ScannerRun> {
    let status: String = column(row, "status")?;
    let Json(provenance): Json<Provenance> = column(row, "provenance")?;
    let scanner: Option<Json<ScannerDetails>> = column(row, "scanner")?;
    let summary: Option<Json<ScanSummary>> = column(row, "summary")?;
    Ok(ScannerRun {
        id: column::<Uuid>(row, "id")?.into(),
        created_at: column(row, "created_at")?,
        provenance,
        status: decode::<ScannerRunStatus>(&status)?,
        scanner: scanner.map(|Json(scanner)| scanner),
        summary: summary.map(|Json(summary)| summary),
    })
}
