use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the shared discovery and dataset helpers
#[derive(Debug, Error)]
pub enum BenchError {
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid task id '{0}': expected a number between 1 and 99")]
    InvalidTaskId(String),

    #[error("Unknown language '{0}' (valid: python, js, rust)")]
    UnknownLanguage(String),

    #[error("Unknown author filter '{0}' (valid: human, ai)")]
    UnknownAuthorFilter(String),
}

impl BenchError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BenchError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, BenchError>;
