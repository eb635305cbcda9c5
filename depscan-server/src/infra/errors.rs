use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use depscan_core::{PipelineError, api_types::ApiResponse};
use std::fmt;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(ApiResponse::<()>::error(self.message));
        (self.status, body).into_response()
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::NotFound(_) => Self::not_found(err.to_string()),
            PipelineError::InvalidInput(_) => {
                Self::bad_request(err.to_string())
            }
            PipelineError::Conflict(_)
            | PipelineError::ClaimConflict { .. } => {
                Self::conflict(err.to_string())
            }
            PipelineError::Storage(_) => {
                tracing::error!(error = %err, "job store operation failed");
                Self::internal("Database operation failed")
            }
            _ => Self::internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_errors_map_to_statuses() {
        let cases = [
            (
                PipelineError::NotFound("project x".into()),
                StatusCode::NOT_FOUND,
            ),
            (
                PipelineError::InvalidInput("blank".into()),
                StatusCode::BAD_REQUEST,
            ),
            (PipelineError::Conflict("in use".into()), StatusCode::CONFLICT),
            (
                PipelineError::Storage("reset".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(AppError::from(err).status, status);
        }
    }

    #[test]
    fn storage_details_are_not_exposed() {
        let err =
            AppError::from(PipelineError::Storage("password=hunter2".into()));
        assert_eq!(err.message, "Database operation failed");
    }
}
