use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures loading, flushing or backing up a file-backed store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access store {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("store {path} is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("store {0} must hold a JSON object at the top level")]
    NotAnObject(PathBuf),
    #[error("zip backup failed: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error(transparent)]
    Backup(#[from] io::Error),
}

/// A stored value that has no plain JSON form.
#[derive(Debug, Error, PartialEq)]
pub enum ValueError {
    #[error("{0} values cannot be represented as JSON")]
    NotJson(String),
    #[error("non-finite number {0} cannot be represented as JSON")]
    NonFinite(f64),
}

/// Text that cannot be turned into a value of the requested kind.
#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("expected {kind}, got {input:?}")]
    Invalid { kind: &'static str, input: String },
    #[error("invalid JSON for {kind}: {message}")]
    Json { kind: &'static str, message: String },
}

impl ParseError {
    pub(crate) fn invalid(kind: &'static str, input: &str) -> Self {
        ParseError::Invalid {
            kind,
            input: input.to_string(),
        }
    }
}
