//! Application-level errors (wraps domain errors)

use thiserror::Error;

use crate::domain::DomainError;

/// Application errors wrap domain errors and add application-level context.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("malformed edit payload at {path}: {message}")]
    MalformedPayload { path: String, message: String },

    #[error("line repository error: {message}")]
    Repository { message: String },

    #[error("config error: {message}")]
    Config { message: String },
}

impl ApplicationError {
    pub fn malformed(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedPayload {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
