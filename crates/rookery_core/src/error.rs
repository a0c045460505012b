use std::path::PathBuf;
use thiserror::Error;

use crate::config::PROPERTY_UNIQUE_ARTIFACT;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Metadata serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Path not found: {0}")]
    NotFound(String),

    #[error("Storage backend unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Insufficient permissions: {0}")]
    Forbidden(String),
}

#[derive(Error, Debug)]
pub enum WriteError {
    #[error(
        "Artifact '{0}' already exists and cannot be overwritten. \
         Set `{PROPERTY_UNIQUE_ARTIFACT}` to false to allow redeployment."
    )]
    Conflict(String),

    #[error("Cannot write to directory path '{0}'")]
    DirectoryPath(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unable to read credentials file {path}: {source}")]
    Credentials {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid Cache-Control value for `{property}`: {reason}")]
    CacheControl { property: String, reason: String },
}

/// A credentials line that could not be parsed. Reported and skipped, never fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{source_name}:{line}: syntax error")]
pub struct MalformedCredentialLine {
    pub source_name: String,
    /// 0-based line number.
    pub line: usize,
}
