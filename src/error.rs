//! Error types for the provider bridge
//!
//! All errors implement `IntoResponse` for Axum handlers.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read config file {path}: {source}")]
    ConfigFileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ConfigParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration in {path}: {reason}")]
    ConfigValidationFailed { path: String, reason: String },

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Invalid routing mode '{0}' (expected adaptive, hybrid or committee)")]
    InvalidMode(String),

    #[error("Unsupported provider type '{kind}' for provider {provider}")]
    UnsupportedAdapterType { provider: String, kind: String },

    #[error("Call to provider {provider} failed: {reason}")]
    ProviderCallFailed { provider: String, reason: String },

    #[error("Call to provider {provider} timed out after {timeout_seconds} seconds")]
    ProviderTimeout {
        provider: String,
        timeout_seconds: u64,
    },

    #[error("All providers failed: {0}")]
    AllProvidersFailed(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Validation(_) | Self::InvalidMode(_) => StatusCode::BAD_REQUEST,
            Self::ProviderCallFailed { .. } => StatusCode::BAD_GATEWAY,
            Self::ProviderTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            Self::Config(_)
            | Self::ConfigFileRead { .. }
            | Self::ConfigParseFailed { .. }
            | Self::ConfigValidationFailed { .. }
            | Self::UnsupportedAdapterType { .. }
            | Self::AllProvidersFailed(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(serde_json::json!({
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}

/// Convenience type alias for Results
pub type AppResult<T> = Result<T, AppError>;
