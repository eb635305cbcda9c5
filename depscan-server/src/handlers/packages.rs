use axum::{
    extract::{Path, State},
    response::Json,
};
use depscan_core::api_types::{AnalyzerRunSummary, ApiResponse};
use depscan_model::{Package, PackageId, PackageOverview, ScannerRun};

use crate::infra::{app_state::AppState, errors::AppResult};

pub async fn list_packages_handler(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Vec<PackageOverview>>>> {
    let packages = state.services.packages.read_packages().await?;
    Ok(Json(ApiResponse::success(packages)))
}

pub async fn get_package_handler(
    State(state): State<AppState>,
    Path(id): Path<PackageId>,
) -> AppResult<Json<ApiResponse<Package>>> {
    let package = state.services.packages.read_package(id).await?;
    Ok(Json(ApiResponse::success(package)))
}

pub async fn package_analyzer_runs_handler(
    State(state): State<AppState>,
    Path(id): Path<PackageId>,
) -> AppResult<Json<ApiResponse<Vec<AnalyzerRunSummary>>>> {
    let runs = state
        .services
        .analyzer
        .read_analyzer_runs_for_package(id)
        .await?;
    Ok(Json(ApiResponse::success(
        runs.iter().map(AnalyzerRunSummary::from).collect(),
    )))
}

pub async fn package_scanner_runs_handler(
    State(state): State<AppState>,
    Path(id): Path<PackageId>,
) -> AppResult<Json<ApiResponse<Vec<ScannerRun>>>> {
    let runs = state
        .services
        .scanner
        .read_scanner_runs_for_package(id)
        .await?;
    Ok(Json(ApiResponse::success(runs)))
}
