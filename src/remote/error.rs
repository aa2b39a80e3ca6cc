//! Remote source error types.

use thiserror::Error;

/// Errors that can occur when fetching options from a remote endpoint.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The endpoint rejected our credentials.
    #[error("Authentication failed for remote endpoint")]
    Unauthorized,

    /// The endpoint denied access.
    #[error("Permission denied: you don't have access to this endpoint")]
    Forbidden,

    /// Endpoint not found.
    #[error("Endpoint not found: {0}")]
    NotFound(String),

    /// Rate limited by the endpoint.
    #[error("Rate limited: please wait before retrying")]
    RateLimited,

    /// The endpoint returned a server error.
    #[error("Server error: {0}")]
    ServerError(String),

    /// Network or HTTP error.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The endpoint URL could not be used.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The response body was not a recognizable option payload.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// A request was attempted without a configured endpoint.
    #[error("No endpoint configured")]
    NoEndpoint,

    /// Signing the outgoing request failed.
    #[error("Failed to sign request: {0}")]
    Signing(String),
}

/// Result type for remote operations.
pub type Result<T> = std::result::Result<T, RemoteError>;

impl RemoteError {
    /// Create an error from an HTTP status code.
    pub fn from_status(status: reqwest::StatusCode, context: &str) -> Self {
        match status.as_u16() {
            401 | 419 => RemoteError::Unauthorized,
            403 => RemoteError::Forbidden,
            404 => RemoteError::NotFound(context.to_string()),
            429 => RemoteError::RateLimited,
            500..=599 => RemoteError::ServerError(format!("HTTP {}: {}", status, context)),
            _ => RemoteError::ServerError(format!("Unexpected HTTP {}: {}", status, context)),
        }
    }

    /// Message suitable for showing next to the select.
    pub fn user_message(&self) -> String {
        match self {
            RemoteError::Unauthorized => "Your session has expired. Please sign in again.".to_string(),
            RemoteError::Forbidden => "You don't have permission to load these options.".to_string(),
            RemoteError::NotFound(_) => "The options endpoint could not be found.".to_string(),
            RemoteError::RateLimited => "Too many requests. Please wait a moment and try again.".to_string(),
            RemoteError::ServerError(_) => "Failed to load options. Please try again later.".to_string(),
            RemoteError::Network(_) => {
                "Connection failed. Please check your internet connection.".to_string()
            }
            RemoteError::InvalidUrl(_) | RemoteError::NoEndpoint => {
                "The options endpoint is not configured correctly.".to_string()
            }
            RemoteError::InvalidResponse(_) => {
                "Unexpected response while loading options.".to_string()
            }
            RemoteError::Signing(_) => "Could not authenticate the options request.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_error_from_status_401() {
        let err = RemoteError::from_status(StatusCode::UNAUTHORIZED, "test");
        assert!(matches!(err, RemoteError::Unauthorized));
    }

    #[test]
    fn test_error_from_status_419_session_expired() {
        let status = StatusCode::from_u16(419).unwrap();
        assert!(matches!(
            RemoteError::from_status(status, "test"),
            RemoteError::Unauthorized
        ));
    }

    #[test]
    fn test_error_from_status_404() {
        let err = RemoteError::from_status(StatusCode::NOT_FOUND, "/api/users");
        match err {
            RemoteError::NotFound(msg) => assert_eq!(msg, "/api/users"),
            _ => panic!("Expected NotFound error"),
        }
    }

    #[test]
    fn test_error_from_status_429() {
        let err = RemoteError::from_status(StatusCode::TOO_MANY_REQUESTS, "test");
        assert!(matches!(err, RemoteError::RateLimited));
    }

    #[test]
    fn test_error_from_status_500() {
        let err = RemoteError::from_status(StatusCode::INTERNAL_SERVER_ERROR, "test");
        assert!(matches!(err, RemoteError::ServerError(_)));
    }

    #[test]
    fn test_error_from_unexpected_status() {
        let err = RemoteError::from_status(StatusCode::IM_A_TEAPOT, "test");
        match err {
            RemoteError::ServerError(msg) => assert!(msg.starts_with("Unexpected HTTP 418")),
            _ => panic!("Expected ServerError"),
        }
    }

    #[test]
    fn test_user_message_hides_details() {
        let err = RemoteError::ServerError("HTTP 500: stack trace".to_string());
        assert!(!err.user_message().contains("stack trace"));
        assert!(err.user_message().contains("Failed to load options"));
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            RemoteError::NotFound("/api/users".to_string()).to_string(),
            "Endpoint not found: /api/users"
        );
        assert_eq!(RemoteError::NoEndpoint.to_string(), "No endpoint configured");
    }
}
