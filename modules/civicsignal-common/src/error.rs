use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CivicSignalError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl CivicSignalError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CivicSignalError::Validation(_) => ErrorKind::Validation,
            CivicSignalError::NotFound(_) => ErrorKind::NotFound,
            CivicSignalError::Forbidden(_) => ErrorKind::Forbidden,
            CivicSignalError::Conflict(_) => ErrorKind::Conflict,
            CivicSignalError::Anyhow(_) => ErrorKind::Internal,
        }
    }
}

/// Stable error category exposed to callers. Internal retry handling may
/// consume a `Conflict` before it ever reaches this mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    Forbidden,
    Conflict,
    Internal,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Validation => write!(f, "validation"),
            ErrorKind::NotFound => write!(f, "not_found"),
            ErrorKind::Forbidden => write!(f, "forbidden"),
            ErrorKind::Conflict => write!(f, "conflict"),
            ErrorKind::Internal => write!(f, "internal"),
        }
    }
}
