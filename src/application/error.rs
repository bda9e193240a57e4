//! Application-level errors (wraps domain errors)

use std::path::PathBuf;
use thiserror::Error;

use crate::application::services::DocumentId;
use crate::domain::DomainError;

/// Application errors wrap domain errors and add application-level context.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("no open document with id {0}")]
    DocumentNotFound(DocumentId),

    #[error("document has no backing file: {0}")]
    NoBackingFile(String),

    #[error("cannot read document {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("unsupported document version {version} in {path}")]
    UnsupportedVersion { path: PathBuf, version: u32 },

    #[error("config error: {message}")]
    Config { message: String },

    #[error("operation failed: {context}")]
    OperationFailed {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
