//! OpenAI-specific error handling.

use landgen_core::Error;

/// OpenAI-specific error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenAIErrorCode {
    /// Invalid authentication credentials.
    AuthenticationError,
    /// Rate limit exceeded.
    RateLimitExceeded,
    /// Model not found or not available.
    ModelNotFound,
    /// Request too large.
    ContextLengthExceeded,
    /// Malformed request.
    BadRequest,
    /// Server error.
    ServerError,
    /// Unknown error.
    Unknown,
}

impl OpenAIErrorCode {
    /// Determine error code from HTTP status and error type.
    pub fn from_response(status: u16, error_type: &str) -> Self {
        match (status, error_type) {
            (401 | 403, _) => Self::AuthenticationError,
            (429, _) => Self::RateLimitExceeded,
            (404, _) | (_, "model_not_found") => Self::ModelNotFound,
            (400, _) if error_type.contains("context_length") => Self::ContextLengthExceeded,
            (400, _) => Self::BadRequest,
            (500..=599, _) => Self::ServerError,
            _ => Self::Unknown,
        }
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimitExceeded | Self::ServerError | Self::Unknown
        )
    }
}

/// Convert an OpenAI error to a landgen Error.
///
/// Retryable codes become `ExternalService`; the rest become variants the
/// dispatcher treats as permanent.
pub fn to_landgen_error(code: OpenAIErrorCode, message: &str) -> Error {
    match code {
        OpenAIErrorCode::AuthenticationError => {
            Error::Config(format!("Authentication failed: {}", message))
        }
        OpenAIErrorCode::RateLimitExceeded => {
            Error::ExternalService(format!("Rate limit exceeded: {}", message))
        }
        OpenAIErrorCode::ModelNotFound => Error::Config(format!("Model not found: {}", message)),
        OpenAIErrorCode::ContextLengthExceeded => {
            Error::Validation(format!("Context too long: {}", message))
        }
        OpenAIErrorCode::BadRequest => Error::Validation(format!("Bad request: {}", message)),
        OpenAIErrorCode::ServerError => {
            Error::ExternalService(format!("Server error: {}", message))
        }
        OpenAIErrorCode::Unknown => Error::ExternalService(message.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_from_401() {
        let code = OpenAIErrorCode::from_response(401, "invalid_api_key");
        assert_eq!(code, OpenAIErrorCode::AuthenticationError);
    }

    #[test]
    fn test_error_code_from_429() {
        let code = OpenAIErrorCode::from_response(429, "rate_limit_exceeded");
        assert_eq!(code, OpenAIErrorCode::RateLimitExceeded);
    }

    #[test]
    fn test_error_code_from_404() {
        let code = OpenAIErrorCode::from_response(404, "model_not_found");
        assert_eq!(code, OpenAIErrorCode::ModelNotFound);
    }

    #[test]
    fn test_error_code_from_400_context_length() {
        let code = OpenAIErrorCode::from_response(400, "context_length_exceeded");
        assert_eq!(code, OpenAIErrorCode::ContextLengthExceeded);
        assert_eq!(
            OpenAIErrorCode::from_response(400, "invalid_request_error"),
            OpenAIErrorCode::BadRequest
        );
    }

    #[test]
    fn test_error_code_from_502() {
        let code = OpenAIErrorCode::from_response(502, "bad_gateway");
        assert_eq!(code, OpenAIErrorCode::ServerError);
    }

    #[test]
    fn test_retryable_codes() {
        assert!(OpenAIErrorCode::RateLimitExceeded.is_retryable());
        assert!(OpenAIErrorCode::ServerError.is_retryable());
        assert!(!OpenAIErrorCode::AuthenticationError.is_retryable());
        assert!(!OpenAIErrorCode::BadRequest.is_retryable());
    }

    #[test]
    fn test_retryable_codes_map_to_external_service() {
        let err = to_landgen_error(OpenAIErrorCode::RateLimitExceeded, "Too many requests");
        assert!(matches!(err, Error::ExternalService(_)));
        assert!(err.to_string().contains("Rate limit exceeded"));

        let err = to_landgen_error(OpenAIErrorCode::ServerError, "overloaded");
        assert!(matches!(err, Error::ExternalService(_)));
    }

    #[test]
    fn test_permanent_codes_map_to_permanent_errors() {
        let err = to_landgen_error(OpenAIErrorCode::AuthenticationError, "Invalid key");
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("Authentication failed"));

        let err = to_landgen_error(OpenAIErrorCode::ContextLengthExceeded, "too long");
        assert!(matches!(err, Error::Validation(_)));
    }
}
