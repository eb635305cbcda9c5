#![cfg(feature = "postgres-tests")]

use depscan_core::database::ports::{
    AnalyzerRunStore, CatalogStore, ScanJobStore, ScannerRunStore,
};
use depscan_core::{PipelineError, PostgresJobStore};
use depscan_model::{
    AnalyzerResult, AnalyzerRun, AnalyzerRunStatus, Identifier,
    PackageDescriptor, Provenance, RepositoryType, ScanSummary,
    ScannerDetails, ScannerRunStatus, VcsInfo, VcsType,
};
use sqlx::{PgPool, Row};

async fn queued_run(store: &PostgresJobStore) -> AnalyzerRun {
    let project = store.create_project("demo").await.unwrap();
    let attachment = store
        .attach_repository(
            project.id,
            RepositoryType::Git,
            "https://example.com/repo.git",
            "",
        )
        .await
        .unwrap();
    store
        .enqueue_analyzer_run(attachment.id, "main", "")
        .await
        .unwrap()
}

fn package(name: &str, path: &str) -> PackageDescriptor {
    let mut pkg =
        PackageDescriptor::new(Identifier::new("NPM", "", name, "1.0.0"));
    pkg.vcs = VcsInfo {
        vcs_type: VcsType::Git,
        url: "https://example.com/mono.git".into(),
        revision: "v1.0.0".into(),
        resolved_revision: None,
        path: path.into(),
    };
    pkg
}

#[sqlx::test(migrator = "depscan_core::MIGRATOR")]
async fn claim_flips_queued_run_once(pool: PgPool) {
    let store = PostgresJobStore::from_pool(pool);
    let run = queued_run(&store).await;

    let claim = store.claim_next_analyzer_run().await.unwrap().unwrap();
    assert_eq!(claim.run.id, run.id);
    assert_eq!(claim.run.status, AnalyzerRunStatus::DownloadingSourceCode);
    assert_eq!(
        claim.project_repository.repository.url,
        "https://example.com/repo.git"
    );

    assert!(store.claim_next_analyzer_run().await.unwrap().is_none());
}

#[sqlx::test(migrator = "depscan_core::MIGRATOR")]
async fn stale_status_write_conflicts(pool: PgPool) {
    let store = PostgresJobStore::from_pool(pool);
    let run = queued_run(&store).await;
    store.claim_next_analyzer_run().await.unwrap().unwrap();

    let err = store
        .advance_analyzer_run(
            run.id,
            AnalyzerRunStatus::AnalyzingDependencies,
            AnalyzerRunStatus::Success,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::ClaimConflict { .. }));

    store
        .fail_analyzer_run(
            run.id,
            AnalyzerRunStatus::DownloadingSourceCode,
            "remote hung up",
        )
        .await
        .unwrap();
    let stored = store.get_analyzer_run(run.id).await.unwrap().unwrap();
    assert_eq!(stored.status, AnalyzerRunStatus::Failed);
    assert_eq!(stored.failure_message.as_deref(), Some("remote hung up"));
}

#[sqlx::test(migrator = "depscan_core::MIGRATOR")]
async fn discovered_packages_dedup_by_descriptor(pool: PgPool) {
    let store = PostgresJobStore::from_pool(pool);
    let run = queued_run(&store).await;
    store.claim_next_analyzer_run().await.unwrap().unwrap();
    store
        .advance_analyzer_run(
            run.id,
            AnalyzerRunStatus::DownloadingSourceCode,
            AnalyzerRunStatus::AnalyzingDependencies,
        )
        .await
        .unwrap();
    store
        .complete_analyzer_run(run.id, &AnalyzerResult::default())
        .await
        .unwrap();

    let descriptor = package("a", "a");
    let first = store
        .register_discovered_package(run.id, &descriptor)
        .await
        .unwrap();
    let second = store
        .register_discovered_package(run.id, &descriptor)
        .await
        .unwrap();

    assert!(first.created);
    assert!(!second.created);
    assert_eq!(first.package_id, second.package_id);
    assert_eq!(store.list_packages().await.unwrap().len(), 1);
    assert_eq!(
        store
            .list_packages_for_analyzer_run(run.id)
            .await
            .unwrap()
            .len(),
        1
    );
}

#[sqlx::test(migrator = "depscan_core::MIGRATOR")]
async fn provenance_merge_and_scan_lifecycle(pool: PgPool) {
    let store = PostgresJobStore::from_pool(pool.clone());
    let run = queued_run(&store).await;

    for (name, path) in [("a", "a/"), ("b", "b/")] {
        store
            .register_discovered_package(run.id, &package(name, path))
            .await
            .unwrap();
    }

    let mut scanner_runs = Vec::new();
    while let Some(claim) = store.claim_next_scan_job().await.unwrap() {
        let provenance =
            Provenance::for_package(&claim.package.descriptor).unwrap();
        let assignment = store
            .attach_or_create_scanner_run(claim.package.id, &provenance)
            .await
            .unwrap();
        store.delete_scan_job(claim.job.id).await.unwrap();
        scanner_runs.push(assignment);
    }

    assert_eq!(scanner_runs.len(), 2);
    assert!(scanner_runs[0].created);
    assert!(!scanner_runs[1].created);
    assert_eq!(scanner_runs[0].scanner_run_id, scanner_runs[1].scanner_run_id);
    let id = scanner_runs[0].scanner_run_id;
    assert_eq!(
        store.list_packages_for_scanner_run(id).await.unwrap().len(),
        2
    );

    let jobs: i64 = sqlx::query("SELECT COUNT(*) FROM scan_jobs")
        .fetch_one(&pool)
        .await
        .unwrap()
        .get(0);
    assert_eq!(jobs, 0);

    let claimed = store.claim_next_scanner_run().await.unwrap().unwrap();
    assert_eq!(claimed.status, ScannerRunStatus::Scanning);

    let details = ScannerDetails {
        name: "ScanCode".into(),
        ..ScannerDetails::default()
    };
    let summary = ScanSummary::failed(&details, "boom", chrono::Utc::now());
    let err = store
        .finish_scanner_run(id, ScannerRunStatus::Scanning, &details, &summary)
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::InvalidInput(_)));

    store
        .finish_scanner_run(id, ScannerRunStatus::Failed, &details, &summary)
        .await
        .unwrap();
    let stored = store.get_scanner_run(id).await.unwrap().unwrap();
    assert_eq!(stored.status, ScannerRunStatus::Failed);
    assert_eq!(stored.summary, Some(summary));

    // The package is scanned now, so rediscovering it queues nothing.
    let again = store
        .register_discovered_package(run.id, &package("a", "a/"))
        .await
        .unwrap();
    assert!(again.scan_job_id.is_none());
}

#[sqlx::test(migrator = "depscan_core::MIGRATOR")]
async fn status_check_rejects_unknown_literals(pool: PgPool) {
    let store = PostgresJobStore::from_pool(pool.clone());
    let run = queued_run(&store).await;

    let result = sqlx::query(
        "UPDATE analyzer_runs SET status = 'PAUSED' WHERE id = $1",
    )
    .bind(run.id.to_uuid())
    .execute(&pool)
    .await;
    assert!(result.is_err(), "CHECK constraint should reject the literal");
}

#[sqlx::test(migrator = "depscan_core::MIGRATOR")]
async fn stranded_work_counts_in_flight_items(pool: PgPool) {
    let store = PostgresJobStore::from_pool(pool);
    queued_run(&store).await;
    assert!(store.stranded_work().await.unwrap().is_empty());

    store.claim_next_analyzer_run().await.unwrap().unwrap();
    let stranded = store.stranded_work().await.unwrap();
    assert_eq!(stranded.analyzer_runs, 1);
    assert_eq!(stranded.scan_jobs, 0);
}

#[sqlx::test(migrator = "depscan_core::MIGRATOR")]
async fn project_with_attachment_cannot_be_deleted(pool: PgPool) {
    let store = PostgresJobStore::from_pool(pool);
    let run = queued_run(&store).await;
    let attachment = store
        .get_project_repository(run.project_repository_id)
        .await
        .unwrap()
        .unwrap();

    let err = store.delete_project(attachment.project_id).await.unwrap_err();
    assert!(matches!(err, PipelineError::Conflict(_)));
}
