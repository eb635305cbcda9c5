use depscan_model::ModelError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// Source fetch failed or the destination was already occupied.
    #[error("{0}")]
    Acquisition(String),

    /// The analysis tool failed or produced no result.
    #[error("{0}")]
    Analysis(String),

    #[error("{0}")]
    Scan(String),

    #[error("No provenance found for package {0}.")]
    ProvenanceMissing(String),

    /// A guarded status write found the row in another status.
    #[error("{entity} {id} is no longer {expected}")]
    ClaimConflict {
        entity: &'static str,
        id: Uuid,
        expected: &'static str,
    },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Storage failures abort the current loop iteration instead of being
    /// recorded on the item being processed.
    pub fn is_storage(&self) -> bool {
        matches!(self, PipelineError::Storage(_))
    }
}

impl From<sqlx::Error> for PipelineError {
    fn from(err: sqlx::Error) -> Self {
        PipelineError::Storage(err.to_string())
    }
}

impl From<ModelError> for PipelineError {
    fn from(err: ModelError) -> Self {
        PipelineError::Storage(format!("corrupt row: {err}"))
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_storage_errors_abort_the_iteration() {
        assert!(PipelineError::Storage("connection reset".into()).is_storage());
        assert!(!PipelineError::Acquisition("x".into()).is_storage());
        assert!(
            !PipelineError::ProvenanceMissing("NPM::a:1".into()).is_storage()
        );
    }

    #[test]
    fn unknown_status_in_a_row_is_a_storage_error() {
        let err: PipelineError = ModelError::UnknownStatus {
            entity: "scan job",
            value: "DONE".into(),
        }
        .into();
        assert!(err.is_storage());
    }
}
