//! Common error types used across all SpaceTechs crates
//! Provides consistent error handling and reporting

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced by the content-API client
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "details")]
pub enum ApiError {
    // Security boundary
    #[error("Invalid endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("Invalid endpoint: URL origin mismatch ({url})")]
    OriginMismatch { url: String },

    #[error("Invalid endpoint: private network access denied ({host})")]
    PrivateNetworkDenied { host: String },

    // Caller input
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    // Transport / response
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    #[error("Invalid JSON response from {status}: {message}")]
    InvalidJson { status: u16, message: String },

    #[error("Network error: {message}")]
    NetworkError { message: String },
}

impl ApiError {
    pub fn invalid_endpoint(endpoint: &str, reason: impl Into<String>) -> Self {
        ApiError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason: reason.into(),
        }
    }

    /// SSRF-guard violations; these indicate a programming error, never a transient fault
    pub fn is_security_violation(&self) -> bool {
        matches!(
            self,
            ApiError::InvalidEndpoint { .. }
                | ApiError::OriginMismatch { .. }
                | ApiError::PrivateNetworkDenied { .. }
        )
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::HttpError { status, .. } | ApiError::InvalidJson { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }

    /// 4xx responses
    pub fn is_client_error(&self) -> bool {
        matches!(self.status(), Some(status) if (400..500).contains(&status))
    }
}

/// Errors raised while building configuration
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid API base URL: {url}. {message}")]
    InvalidBaseUrl { url: String, message: String },
}

/// Errors raised by scene objects; always contained by the scene graph
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SceneError {
    #[error("Resource allocation failed for {label}: {message}")]
    ResourceAllocation { label: String, message: String },

    #[error("Texture load failed for {path}: {message}")]
    TextureLoad { path: String, message: String },

    #[error("Unknown scene component: {tag}")]
    UnknownComponent { tag: String },
}

/// Errors raised by the preferences storage layer
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StorageError {
    #[error("Storage unavailable: {message}")]
    Unavailable { message: String },

    #[error("Storage serialization error: {message}")]
    Serialization { message: String },
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization {
            message: err.to_string(),
        }
    }
}

/// Result type alias for content-API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// Error response structure for JavaScript interop
#[derive(Serialize, Deserialize, Debug)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ApiError,
    pub timestamp: u64,
    pub context: Option<ErrorContext>,
}

/// Additional context for error reporting
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ErrorContext {
    pub component: String,
    pub operation: String,
}

impl ErrorResponse {
    pub fn new(error: ApiError) -> Self {
        Self {
            success: false,
            error,
            timestamp: chrono::Utc::now().timestamp_millis() as u64,
            context: None,
        }
    }

    pub fn with_context(mut self, component: &str, operation: &str) -> Self {
        self.context = Some(ErrorContext {
            component: component.to_string(),
            operation: operation.to_string(),
        });
        self
    }

    /// Convert to JSON string for JavaScript
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            r#"{"success":false,"error":{"type":"NetworkError","details":{"message":"Failed to serialize error"}}}"#.to_string()
        })
    }
}
