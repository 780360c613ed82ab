//! Common error types for Wortschatz

use thiserror::Error;

/// Common result type for Wortschatz operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the word store, progress mirror and web layer
#[derive(Error, Debug)]
pub enum Error {
    /// A required word field is missing or empty
    #[error("Missing required field: {field}")]
    Validation { field: String },

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Word list could not be read (callers treat this as "no data")
    #[error("Storage read error: {0}")]
    StorageRead(String),

    /// Word list could not be appended to or rewritten
    #[error("Storage write error: {0}")]
    StorageWrite(String),

    /// Remote progress store failure
    #[error("Remote store error: {0}")]
    Remote(String),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV encoding or decoding error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON encoding or decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn missing_field(field: impl Into<String>) -> Self {
        Error::Validation {
            field: field.into(),
        }
    }

    /// True for errors caused by the caller's input rather than storage
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation { .. } | Error::InvalidInput(_))
    }
}
