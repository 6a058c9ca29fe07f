use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("environment '{0}' not found")]
    NotFound(String),

    #[error("environment '{0}' already exists")]
    AlreadyExists(String),

    #[error("invalid environment: {0}")]
    Validation(String),

    #[error("registry already initialized at {0}")]
    AlreadyInitialized(String),

    #[error("registry lock poisoned")]
    LockPoisoned,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RegistryError>;
