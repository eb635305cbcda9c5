use depscan_model::{
    AnalyzerRunId, AnalyzerRunStatus, ProjectRepositoryId, RepositoryType,
};
use serde::{Deserialize, Serialize};

/// JSON envelope for every HTTP response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            status: "success".to_string(),
            data: Some(data),
            error: None,
            message: None,
        }
    }

    pub fn error(error: String) -> Self {
        Self {
            status: "error".to_string(),
            data: None,
            error: Some(error),
            message: None,
        }
    }

    pub fn with_message(mut self, message: String) -> Self {
        self.message = Some(message);
        self
    }
}

// ===== Project API Types =====

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateProjectRequest {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddRepositoryRequest {
    #[serde(rename = "type")]
    pub repo_type: RepositoryType,
    pub url: String,
    #[serde(default)]
    pub path: String,
}

// ===== Analyzer API Types =====

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartAnalyzerRequest {
    pub project_repository_id: ProjectRepositoryId,
    pub revision: String,
}

/// Analyzer run without its result payload, for listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerRunSummary {
    pub id: AnalyzerRunId,
    pub project_repository_id: ProjectRepositoryId,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub revision: String,
    pub status: AnalyzerRunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_message: Option<String>,
    pub package_count: usize,
    pub issue_count: usize,
}

impl From<&depscan_model::AnalyzerRun> for AnalyzerRunSummary {
    fn from(run: &depscan_model::AnalyzerRun) -> Self {
        let (package_count, issue_count) = run
            .result
            .as_ref()
            .map(|result| {
                (
                    result.projects.len() + result.packages.len(),
                    result.issues.len(),
                )
            })
            .unwrap_or_default();
        Self {
            id: run.id,
            project_repository_id: run.project_repository_id,
            created_at: run.created_at,
            revision: run.revision.clone(),
            status: run.status,
            failure_message: run.failure_message.clone(),
            package_count,
            issue_count,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyTreeQuery {
    #[serde(default)]
    pub max_depth: Option<usize>,
}
