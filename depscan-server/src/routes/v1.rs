use axum::{
    Router,
    routing::{get, post},
};

use crate::{
    handlers::{analyzer, packages, projects, scanner},
    infra::app_state::AppState,
};

pub fn create_v1_router() -> Router<AppState> {
    Router::new()
        .merge(create_project_routes())
        .merge(create_analyzer_routes())
        .merge(create_package_routes())
        .merge(create_scanner_routes())
}

fn create_project_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/projects",
            get(projects::list_projects_handler)
                .post(projects::create_project_handler),
        )
        .route(
            "/projects/{id}",
            get(projects::get_project_handler)
                .put(projects::update_project_handler)
                .delete(projects::delete_project_handler),
        )
        .route(
            "/projects/{id}/repositories",
            get(projects::list_repositories_handler)
                .post(projects::add_repository_handler),
        )
        .route(
            "/project-repositories/{id}/analyzer-runs",
            get(projects::list_repository_runs_handler),
        )
}

fn create_analyzer_routes() -> Router<AppState> {
    Router::new()
        .route("/analyzer-runs", post(analyzer::start_analyzer_handler))
        .route("/analyzer-runs/{id}", get(analyzer::get_analyzer_run_handler))
        .route(
            "/analyzer-runs/{id}/dependency-tree",
            get(analyzer::dependency_tree_handler),
        )
        .route(
            "/analyzer-runs/{id}/packages",
            get(analyzer::analyzer_run_packages_handler),
        )
}

fn create_package_routes() -> Router<AppState> {
    Router::new()
        .route("/packages", get(packages::list_packages_handler))
        .route("/packages/{id}", get(packages::get_package_handler))
        .route(
            "/packages/{id}/analyzer-runs",
            get(packages::package_analyzer_runs_handler),
        )
        .route(
            "/packages/{id}/scanner-runs",
            get(packages::package_scanner_runs_handler),
        )
}

fn create_scanner_routes() -> Router<AppState> {
    Router::new()
        .route("/scanner-runs", get(scanner::list_scanner_runs_handler))
        .route("/scanner-runs/{id}", get(scanner::get_scanner_run_handler))
        .route(
            "/scanner-runs/{id}/summary",
            get(scanner::scan_summary_handler),
        )
        .route(
            "/scanner-runs/{id}/packages",
            get(scanner::scanner_run_packages_handler),
        )
}
