// src/error.rs
// Standardized error types for the devtools server

use thiserror::Error;

/// Main error type for the devtools library
#[derive(Error, Debug)]
pub enum DevToolsError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("access denied [{id}]: {reason}")]
    PolicyDenied { id: String, reason: String },

    #[error("resource limit: {0}")]
    ResourceGate(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("maximum AST depth exceeded ({0} frames)")]
    AstTooDeep(usize),

    #[error("AST node count exceeded {0}; refusing to process (possible adversarial input)")]
    AstTooLarge(usize),

    #[error("{0}")]
    External(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("operation cancelled")]
    Cancelled,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("unknown error: {0}")]
    Other(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

/// Convenience type alias for Result using DevToolsError
pub type Result<T> = std::result::Result<T, DevToolsError>;

impl From<String> for DevToolsError {
    fn from(s: String) -> Self {
        DevToolsError::Other(s)
    }
}

impl From<tokio::task::JoinError> for DevToolsError {
    fn from(err: tokio::task::JoinError) -> Self {
        if err.is_cancelled() {
            DevToolsError::Cancelled
        } else {
            DevToolsError::Other(err.to_string())
        }
    }
}

impl From<DevToolsError> for String {
    fn from(err: DevToolsError) -> Self {
        err.to_string()
    }
}
