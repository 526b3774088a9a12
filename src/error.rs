//! Error types shared by the sifter library.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SiftError {
    /// Joined or compared tables disagree on their columns.
    #[error("Schema mismatch in {path}: {reason}")]
    SchemaMismatch { path: PathBuf, reason: String },

    /// The row store could not be loaded.
    #[error("Row store error in {path}: {reason}")]
    Storage { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    /// The quote endpoint answered a batch with no results at all.
    #[error("No quote results from {url}")]
    MissingQuotes { url: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Failed to replace file: {0}")]
    Persist(#[from] tempfile::PersistError),
}

impl SiftError {
    pub fn schema(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        SiftError::SchemaMismatch {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn storage(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        SiftError::Storage {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SiftError>;
