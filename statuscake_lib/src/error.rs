//! Error types for the StatusCake API client.

use std::path::PathBuf;
use thiserror::Error;

/// Base error type for StatusCake operations.
///
/// Every failure of a dispatched request maps to exactly one variant; none are retried.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Invalid response: {0}")]
    InvalidResponse(#[from] InvalidResponse),

    #[error("API error: {0}")]
    Api(#[from] ApiError),
}

/// Raised when a configuration file is missing, unreadable or malformed, or when a
/// required value is not provided by any source.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config file not found: {}", .path.display())]
    NotFound { path: PathBuf },

    #[error("failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {} at line {line}: {message}", .path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("no value configured for {section}.{key}")]
    MissingValue { section: String, key: String },

    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Raised when the transport fails before a response is available
/// (connection refused, DNS, TLS, timeout).
#[derive(Error, Debug)]
#[error("{message}")]
pub struct HttpError {
    pub message: String,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl HttpError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }
}

impl From<reqwest::Error> for HttpError {
    fn from(err: reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            "request timed out".to_string()
        } else if err.is_connect() {
            "connection failed".to_string()
        } else {
            "request failed".to_string()
        };
        Self::with_source(message, err)
    }
}

/// Raised when the transport returned without a usable response (status code 0).
#[derive(Error, Debug)]
#[error("no usable response received from {url}")]
pub struct NetworkError {
    pub url: String,
}

/// Raised when the response body is not valid JSON.
#[derive(Error, Debug)]
#[error("response body is not valid JSON (status {status_code}): {source}")]
pub struct InvalidResponse {
    pub status_code: u16,
    #[source]
    pub source: serde_json::Error,
}

/// Raised when the API returns an error response.
#[derive(Error, Debug)]
#[error("{message}")]
pub struct ApiError {
    pub message: String,
    pub status_code: u16,
    pub response_data: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(
        message: impl Into<String>,
        status_code: u16,
        response_data: Option<serde_json::Value>,
    ) -> Self {
        Self {
            message: message.into(),
            status_code,
            response_data,
        }
    }
}
