use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use depscan_core::api_types::{
    AddRepositoryRequest, AnalyzerRunSummary, ApiResponse, CreateProjectRequest,
    UpdateProjectRequest,
};
use depscan_model::{Project, ProjectId, ProjectRepository, ProjectRepositoryId};
use tracing::info;

use crate::infra::{app_state::AppState, errors::AppResult};

pub async fn create_project_handler(
    State(state): State<AppState>,
    Json(request): Json<CreateProjectRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Project>>)> {
    let project = state.services.projects.create_project(&request.name).await?;
    info!(project = %project.id, name = %project.name, "created project");
    Ok((StatusCode::CREATED, Json(ApiResponse::success(project))))
}

pub async fn list_projects_handler(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Vec<Project>>>> {
    let projects = state.services.projects.read_projects().await?;
    Ok(Json(ApiResponse::success(projects)))
}

pub async fn get_project_handler(
    State(state): State<AppState>,
    Path(id): Path<ProjectId>,
) -> AppResult<Json<ApiResponse<Project>>> {
    let project = state.services.projects.read_project(id).await?;
    Ok(Json(ApiResponse::success(project)))
}

pub async fn update_project_handler(
    State(state): State<AppState>,
    Path(id): Path<ProjectId>,
    Json(request): Json<UpdateProjectRequest>,
) -> AppResult<Json<ApiResponse<Project>>> {
    let project = state
        .services
        .projects
        .update_project(id, &request.name)
        .await?;
    Ok(Json(ApiResponse::success(project)))
}

pub async fn delete_project_handler(
    State(state): State<AppState>,
    Path(id): Path<ProjectId>,
) -> AppResult<Json<ApiResponse<()>>> {
    state.services.projects.delete_project(id).await?;
    info!(project = %id, "deleted project");
    Ok(Json(
        ApiResponse::success(()).with_message("Project deleted".to_string()),
    ))
}

pub async fn add_repository_handler(
    State(state): State<AppState>,
    Path(id): Path<ProjectId>,
    Json(request): Json<AddRepositoryRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<ProjectRepository>>)> {
    let attachment = state
        .services
        .projects
        .add_repository(id, request.repo_type, &request.url, &request.path)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(attachment))))
}

pub async fn list_repositories_handler(
    State(state): State<AppState>,
    Path(id): Path<ProjectId>,
) -> AppResult<Json<ApiResponse<Vec<ProjectRepository>>>> {
    let attachments = state.services.projects.read_repositories(id).await?;
    Ok(Json(ApiResponse::success(attachments)))
}

/// Analyzer runs of one attachment, newest first, without result payloads.
pub async fn list_repository_runs_handler(
    State(state): State<AppState>,
    Path(id): Path<ProjectRepositoryId>,
) -> AppResult<Json<ApiResponse<Vec<AnalyzerRunSummary>>>> {
    let runs = state
        .services
        .analyzer
        .read_analyzer_runs_for_project_repository(id)
        .await?;
    Ok(Json(ApiResponse::success(
        runs.iter().map(AnalyzerRunSummary::from).collect(),
    )))
}
