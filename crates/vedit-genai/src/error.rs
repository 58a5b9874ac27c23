//! Model service error types.

use thiserror::Error;

/// Result type for model calls.
pub type GenAiResult<T> = Result<T, GenAiError>;

/// Errors reported by the generative model service.
///
/// Rate-limit conditions get their own variant so callers can retry them
/// without string-matching error text.
#[derive(Debug, Error)]
pub enum GenAiError {
    #[error("Failed to configure model client: {0}")]
    ConfigError(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Model API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid model response: {0}")]
    InvalidResponse(String),
}

impl GenAiError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// True if this failure is a rate-limit condition worth backing off on.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, GenAiError::RateLimited(_))
    }
}

/// Map a non-success HTTP reply onto the error taxonomy.
///
/// The service signals quota exhaustion with a 429 status or a
/// `RESOURCE_EXHAUSTED` marker in the error payload.
pub fn classify_api_error(status: u16, body: &str) -> GenAiError {
    if status == 429 || body.contains("RESOURCE_EXHAUSTED") {
        GenAiError::RateLimited(format!("{}: {}", status, body))
    } else {
        GenAiError::Api {
            status,
            message: body.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_429_classifies_as_rate_limited() {
        assert!(classify_api_error(429, "too many requests").is_rate_limited());
    }

    #[test]
    fn test_resource_exhausted_marker_classifies_as_rate_limited() {
        let err = classify_api_error(503, r#"{"status":"RESOURCE_EXHAUSTED"}"#);
        assert!(err.is_rate_limited());
    }

    #[test]
    fn test_other_statuses_are_not_rate_limited() {
        let err = classify_api_error(400, "bad request");
        assert!(!err.is_rate_limited());
        assert!(matches!(err, GenAiError::Api { status: 400, .. }));
    }
}
