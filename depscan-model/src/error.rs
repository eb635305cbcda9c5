use std::fmt::{self, Display};

/// Errors produced when decoding persisted or user supplied model values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// A status literal that is not part of the entity's closed enumeration.
    UnknownStatus { entity: &'static str, value: String },
    UnknownVcsType(String),
    UnknownRepositoryType(String),
    InvalidId(String),
}

impl Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::UnknownStatus { entity, value } => {
                write!(f, "unknown {entity} status: {value:?}")
            }
            ModelError::UnknownVcsType(value) => {
                write!(f, "unknown vcs type: {value:?}")
            }
            ModelError::UnknownRepositoryType(value) => {
                write!(f, "unknown repository type: {value:?}")
            }
            ModelError::InvalidId(value) => write!(f, "invalid id: {value}"),
        }
    }
}

impl std::error::Error for ModelError {}

pub type Result<T> = std::result::Result<T, ModelError>;
