//! Centralized error types for async-select.
//!
//! Module errors (`ConfigError`, `RemoteError`, `AuthError`) are aggregated
//! here with messages suitable for showing to end users. Option and selection
//! operations never fail and have no error type.

use thiserror::Error;

use crate::auth::AuthError;
use crate::config::ConfigError;
use crate::remote::RemoteError;

/// The main application error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration-related errors.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// Remote option loading errors.
    #[error("{0}")]
    Remote(#[from] RemoteError),

    /// Internal authentication errors.
    #[error("{0}")]
    Auth(#[from] AuthError),

    /// IO errors (file system, etc.).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON input.
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with a message.
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Create a generic error.
    pub fn other(msg: impl Into<String>) -> Self {
        AppError::Other(msg.into())
    }

    /// Get a user-friendly message for display.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Config(e) => match e {
                ConfigError::NoConfigDir => {
                    "Could not find configuration directory. Please check your system settings."
                        .to_string()
                }
                ConfigError::ReadError(_) => {
                    "Could not read configuration file. Please check the file exists and is readable.".to_string()
                }
                ConfigError::ParseError(_) => {
                    "Configuration file is invalid. Please check the file format.".to_string()
                }
                ConfigError::ValidationError(msg) => format!("Configuration error: {}", msg),
                ConfigError::InvalidEnv { key, .. } => {
                    format!("Environment variable {} has an invalid value.", key)
                }
            },
            AppError::Remote(e) => e.user_message(),
            AppError::Auth(e) => match e.status_code() {
                403 => "You don't have permission to perform this request.".to_string(),
                _ => "Request authentication failed.".to_string(),
            },
            AppError::Io(_) => "A file operation failed. Please check file permissions.".to_string(),
            AppError::Json(_) => "The input is not valid JSON.".to_string(),
            AppError::Other(msg) => msg.clone(),
        }
    }

    /// Check if this error is critical and stops the operation for good.
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            AppError::Config(_)
                | AppError::Remote(RemoteError::Unauthorized)
                | AppError::Remote(RemoteError::Forbidden)
                | AppError::Remote(RemoteError::NoEndpoint)
                | AppError::Remote(RemoteError::InvalidUrl(_))
        )
    }

    /// Check if retrying (reload or a new search) may succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AppError::Remote(RemoteError::RateLimited)
                | AppError::Remote(RemoteError::ServerError(_))
                | AppError::Remote(RemoteError::Network(_))
                | AppError::Remote(RemoteError::NotFound(_))
                | AppError::Remote(RemoteError::InvalidResponse(_))
        )
    }
}

/// Result type for application operations.
pub type Result<T> = std::result::Result<T, AppError>;
