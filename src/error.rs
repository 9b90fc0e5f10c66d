//! Error types for Inkline

use serde::Serialize;
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum InklineError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("GitHub API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Save conflict: {path} changed on the remote since it was loaded")]
    Conflict { path: String },

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("{0} is a directory; rename or delete it with a local git client instead")]
    DirectoryUnsupported(String),

    #[error("Invalid diagram document: {0}")]
    InvalidDocument(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Credential store error: {0}")]
    Credentials(String),

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

impl InklineError {
    /// Stable machine-readable code for the shell
    fn code(&self) -> &'static str {
        match self {
            InklineError::Http(_) => "HTTP_ERROR",
            InklineError::Api { .. } => "API_ERROR",
            InklineError::Conflict { .. } => "SAVE_CONFLICT",
            InklineError::FileNotFound(_) => "FILE_NOT_FOUND",
            InklineError::DirectoryUnsupported(_) => "DIRECTORY_UNSUPPORTED",
            InklineError::InvalidDocument(_) => "INVALID_DOCUMENT",
            InklineError::Serialization(_) => "SERIALIZATION_ERROR",
            InklineError::Validation(_) => "VALIDATION_ERROR",
            InklineError::Credentials(_) => "CREDENTIALS_ERROR",
            InklineError::OperationFailed(_) => "OPERATION_FAILED",
        }
    }
}

/// Serializable error response for IPC
#[derive(Serialize, Debug)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
}

impl From<InklineError> for ErrorResponse {
    fn from(error: InklineError) -> Self {
        ErrorResponse {
            code: error.code().to_string(),
            message: error.to_string(),
            details: None,
        }
    }
}

// Errors cross the shell boundary as their response shape
impl serde::Serialize for InklineError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let response = ErrorResponse {
            code: self.code().to_string(),
            message: self.to_string(),
            details: None,
        };
        response.serialize(serializer)
    }
}

/// Result type alias for Inkline operations
pub type Result<T> = std::result::Result<T, InklineError>;
