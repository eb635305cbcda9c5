//! # depscan server
//!
//! Runs the analysis pipeline workers next to a JSON API for creating
//! projects, queueing analyzer runs and browsing their results.
//!
//! All routes live under `/api/v1` and answer with the
//! [`ApiResponse`](depscan_core::api_types::ApiResponse) envelope.

pub mod handlers;
pub mod infra;
pub mod routes;

use axum::{
    Router, extract::State, http::StatusCode, response::Json, routing::get,
};
use serde_json::{Value, json};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::warn;

pub use infra::{
    app_state::AppState,
    errors::{AppError, AppResult},
};

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .merge(routes::create_api_router())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_handler(
    State(state): State<AppState>,
) -> (StatusCode, Json<Value>) {
    let mut health_status = json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
        "checks": {}
    });

    let status = match state.services.projects.read_projects().await {
        Ok(projects) => {
            health_status["checks"]["database"] = json!({
                "status": "healthy",
                "projects": projects.len(),
            });
            StatusCode::OK
        }
        Err(e) => {
            warn!(error = %e, "health check could not reach the job store");
            health_status["status"] = json!("unhealthy");
            health_status["checks"]["database"] = json!({
                "status": "unhealthy",
                "error": e.to_string()
            });
            StatusCode::SERVICE_UNAVAILABLE
        }
    };

    (status, Json(health_status))
}
