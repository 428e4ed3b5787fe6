//! Failure classification.

use landgen_core::Error;

/// Whether a failed attempt deserves another try.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Transient; requeue while attempts remain.
    Retryable,
    /// Retrying cannot help; fail the job now.
    Permanent,
}

/// Classify an error returned by a job attempt.
pub fn classify(err: &Error) -> FailureClass {
    match err {
        Error::ExternalService(_)
        | Error::Timeout { .. }
        | Error::Request(_)
        | Error::Database(_)
        | Error::Internal(_) => FailureClass::Retryable,
        Error::Validation(_)
        | Error::NotFound(_)
        | Error::ExhaustedRetries { .. }
        | Error::Config(_)
        | Error::Serialization(_) => FailureClass::Permanent,
    }
}
