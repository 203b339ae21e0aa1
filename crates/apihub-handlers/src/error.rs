//! Error type for the built-in handlers.
//!
//! Request validation failures and upstream API failures are kept apart so
//! the HTTP layer can answer 400 for the former and 502 for the latter.

use apihub_core::error::AppError;
use thiserror::Error;

/// Unified error type for built-in handler operations.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// A required request parameter is absent or empty.
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    /// A request parameter is present but unusable.
    #[error("{0}")]
    InvalidParameter(String),

    /// The manifest `options` object does not fit the handler.
    #[error("Invalid handler options: {0}")]
    InvalidOptions(String),

    /// The HTTP client could not be configured.
    #[error("HTTP client setup failed: {0}")]
    ClientSetup(String),

    /// The upstream request failed before a response arrived.
    #[error("Request error: {0}")]
    Upstream(#[from] reqwest::Error),

    /// The upstream API answered with a non-success status.
    #[error("Upstream returned status {status}: {body}")]
    UpstreamStatus {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly truncated.
        body: String,
    },
}

impl HandlerError {
    /// Creates an invalid-parameter error.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidParameter(message.into())
    }
}

impl From<HandlerError> for AppError {
    fn from(err: HandlerError) -> Self {
        match &err {
            HandlerError::MissingParameter(_) | HandlerError::InvalidParameter(_) => {
                AppError::validation(err.to_string())
            }
            HandlerError::InvalidOptions(_) | HandlerError::ClientSetup(_) => {
                AppError::configuration(err.to_string())
            }
            HandlerError::Upstream(_) | HandlerError::UpstreamStatus { .. } => {
                AppError::external_service(err.to_string())
            }
        }
    }
}

/// Convenience alias for handler results.
pub type HandlerResult<T> = Result<T, HandlerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use apihub_core::error::ErrorKind;

    #[test]
    fn test_validation_errors_map_to_validation_kind() {
        let err: AppError = HandlerError::MissingParameter("url".to_string()).into();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert_eq!(err.message, "Missing required parameter: url");
    }

    #[test]
    fn test_upstream_status_maps_to_external_service() {
        let err: AppError = HandlerError::UpstreamStatus {
            status: 503,
            body: "down".to_string(),
        }
        .into();
        assert_eq!(err.kind, ErrorKind::ExternalService);
    }
}
