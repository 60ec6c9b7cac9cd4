//! Error types for the glossary catalog

use glossary_model::ValidationError;
use thiserror::Error;

/// Persistence failures (write-ahead log, snapshot, diagnostics file).
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("encoding error: {0}")]
    Encoding(#[from] bincode::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("write-ahead log is corrupt at byte {offset}")]
    Corrupt { offset: u64 },

    #[error("storage commit failed after {attempts} attempt(s): {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },
}

/// A lookup for an identifier that is not in the store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("term not found: {0}")]
pub struct TermNotFound(pub String);

/// Errors from a single-record write.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}
