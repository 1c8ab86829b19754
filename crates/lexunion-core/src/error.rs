use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Document is missing field '{field}'")]
    MissingField { field: String },

    #[error("Backend '{backend}' failed: {message}")]
    Backend { backend: String, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Wrap a backend-specific failure (tantivy, remote engines, ...).
    pub fn backend(backend: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Backend { backend: backend.into(), message: err.to_string() }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
