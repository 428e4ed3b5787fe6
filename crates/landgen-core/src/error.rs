//! Error types for landgen.

use thiserror::Error;

/// Result type alias using landgen's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for landgen operations.
///
/// The first five variants form the job failure taxonomy the dispatcher
/// classifies on; the rest are infrastructure and plumbing errors.
#[derive(Error, Debug)]
pub enum Error {
    /// Bad input rejected synchronously (never retried).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Resource not found (a job's subject vanished, unknown job id, ...).
    #[error("Not found: {0}")]
    NotFound(String),

    /// An effect executor's network or HTTP call failed.
    #[error("External service error: {0}")]
    ExternalService(String),

    /// The job consumed all of its attempts.
    #[error("Exhausted retries: {attempts}/{max_attempts} attempts used")]
    ExhaustedRetries { attempts: i32, max_attempts: i32 },

    /// A single job exceeded its per-job timeout.
    #[error("Timed out after {secs}s")]
    Timeout { secs: u64 },

    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether this error means the job store itself is unreachable or broken.
    ///
    /// Only these errors abort a whole dispatch cycle.
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, Error::Database(_) | Error::Internal(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Error::ExternalService(format!("request timed out: {}", e))
        } else {
            Error::Request(e.to_string())
        }
    }
}
