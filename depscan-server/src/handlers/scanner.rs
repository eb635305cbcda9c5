use axum::{
    extract::{Path, State},
    response::Json,
};
use depscan_core::api_types::ApiResponse;
use depscan_model::{Package, ScanSummary, ScannerRun, ScannerRunId};

use crate::infra::{app_state::AppState, errors::AppResult};

pub async fn list_scanner_runs_handler(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Vec<ScannerRun>>>> {
    let runs = state.services.scanner.read_scanner_runs().await?;
    Ok(Json(ApiResponse::success(runs)))
}

pub async fn get_scanner_run_handler(
    State(state): State<AppState>,
    Path(id): Path<ScannerRunId>,
) -> AppResult<Json<ApiResponse<ScannerRun>>> {
    let run = state.services.scanner.read_scanner_run(id).await?;
    Ok(Json(ApiResponse::success(run)))
}

/// 404 until the run reached a terminal status.
pub async fn scan_summary_handler(
    State(state): State<AppState>,
    Path(id): Path<ScannerRunId>,
) -> AppResult<Json<ApiResponse<ScanSummary>>> {
    let summary = state.services.scanner.read_scan_summary(id).await?;
    Ok(Json(ApiResponse::success(summary)))
}

pub async fn scanner_run_packages_handler(
    State(state): State<AppState>,
    Path(id): Path<ScannerRunId>,
) -> AppResult<Json<ApiResponse<Vec<Package>>>> {
    let packages = state
        .services
        .scanner
        .read_packages_for_scanner_run(id)
        .await?;
    Ok(Json(ApiResponse::success(packages)))
}
