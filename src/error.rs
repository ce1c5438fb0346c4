use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScoutError {
    #[error("package manager not found: {0}")]
    ManagerMissing(String),

    #[error("metadata query tool not available: {0}")]
    MetadataToolMissing(String),

    #[error("`{command}` exited with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("`{command}` timed out after {}s", .timeout.as_secs())]
    Timeout { command: String, timeout: Duration },

    #[error("interrupted")]
    Interrupted,

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("{kind} not found: {name}")]
    NotFound { kind: &'static str, name: String },

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Error: {0}")]
    Other(#[from] anyhow::Error),
}

impl ScoutError {
    /// Missing tools stop the run before any other work begins.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ScoutError::ManagerMissing(_) | ScoutError::MetadataToolMissing(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ScoutError>;
