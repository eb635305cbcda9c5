use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use depscan_core::{
    api_types::{ApiResponse, DependencyTreeQuery, StartAnalyzerRequest},
    services::ProjectDependencyTree,
};
use depscan_model::{AnalyzerRun, AnalyzerRunId, PackageOverview};

use crate::infra::{app_state::AppState, errors::AppResult};

/// Queue an analysis; the run is returned in `QUEUED` status.
pub async fn start_analyzer_handler(
    State(state): State<AppState>,
    Json(request): Json<StartAnalyzerRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<AnalyzerRun>>)> {
    let run = state
        .services
        .analyzer
        .start_analyzer(request.project_repository_id, &request.revision)
        .await?;
    Ok((StatusCode::ACCEPTED, Json(ApiResponse::success(run))))
}

pub async fn get_analyzer_run_handler(
    State(state): State<AppState>,
    Path(id): Path<AnalyzerRunId>,
) -> AppResult<Json<ApiResponse<AnalyzerRun>>> {
    let run = state.services.analyzer.read_analyzer_run(id).await?;
    Ok(Json(ApiResponse::success(run)))
}

pub async fn dependency_tree_handler(
    State(state): State<AppState>,
    Path(id): Path<AnalyzerRunId>,
    Query(query): Query<DependencyTreeQuery>,
) -> AppResult<Json<ApiResponse<Vec<ProjectDependencyTree>>>> {
    let trees = state
        .services
        .analyzer
        .read_dependency_tree(id, query.max_depth)
        .await?;
    Ok(Json(ApiResponse::success(trees)))
}

pub async fn analyzer_run_packages_handler(
    State(state): State<AppState>,
    Path(id): Path<AnalyzerRunId>,
) -> AppResult<Json<ApiResponse<Vec<PackageOverview>>>> {
    let packages = state
        .services
        .packages
        .read_packages_for_analyzer_run(id)
        .await?;
    Ok(Json(ApiResponse::success(packages)))
}
