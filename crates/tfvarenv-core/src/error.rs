//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("{command} exited with code {exit_code}: {stderr}")]
    ExternalTool {
        command: String,
        exit_code: i32,
        stderr: String,
    },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("{0}")]
    Cancelled(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Registry(#[from] tfvarenv_config::RegistryError),
}

impl CoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CoreError::NotFound(_)
                | CoreError::Registry(tfvarenv_config::RegistryError::NotFound(_))
        )
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, CoreError::Cancelled(_))
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
