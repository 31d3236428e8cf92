use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("configured root directory does not exist: {0}")]
    RootMissing(PathBuf),

    #[error("configured root is not a directory: {0}")]
    RootNotADirectory(PathBuf),

    #[error("metadata unavailable for {path}: {source}")]
    MetadataUnavailable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("document not found: {folder}/{filename}")]
    NotFound { folder: String, filename: String },

    #[error("path escapes the configured root: {folder}/{filename}")]
    TraversalRejected { folder: String, filename: String },

    #[error("not a pdf file: {filename}")]
    NotPdf { filename: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = IndexError> = std::result::Result<T, E>;
