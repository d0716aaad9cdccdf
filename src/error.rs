use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SpockError {
    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("environment error: {0}")]
    Environment(String),

    #[error("resource error: {0}")]
    Resource(String),

    #[error("command error: {0}")]
    Command(String),

    #[error("IO error at '{path}': {source}")]
    IoAt {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parsing error in '{file}': {message}")]
    Parse { file: String, message: String },

    #[error(transparent)]
    Yaml(#[from] serde_yml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl SpockError {
    /// Attach a file path to a low-level IO error.
    pub fn io_at(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SpockError::IoAt {
            path: path.into(),
            source,
        }
    }

    /// Wrap a YAML or validation failure with the offending file.
    pub fn parse_in(file: &std::path::Path, message: impl std::fmt::Display) -> Self {
        SpockError::Parse {
            file: file.display().to_string(),
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SpockError>;
