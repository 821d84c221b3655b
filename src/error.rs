// src/error.rs

//! Unified error handling for the consent engine.

use std::fmt;

use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Prefix carried by every diagnostic the engine logs.
pub const ERROR_PREFIX: &str = "MediaConsent";

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// A readiness wait exhausted its attempts
    #[error("Timed out waiting for {what} after {attempts} attempts")]
    Timeout { what: String, attempts: u32 },

    /// The consent platform global never appeared
    #[error("Consent management platform not available")]
    CmpUnavailable,

    /// Thumbnail lookup failed (non-fatal for gating)
    #[error("Thumbnail fetch error: {0}")]
    ThumbnailFetch(String),

    /// An initializer was handed an element it does not manage
    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppError {
    /// Create a timeout error for the named readiness condition.
    pub fn timeout(what: impl Into<String>, attempts: u32) -> Self {
        Self::Timeout {
            what: what.into(),
            attempts,
        }
    }

    /// Create a thumbnail fetch error.
    pub fn thumbnail(message: impl fmt::Display) -> Self {
        Self::ThumbnailFetch(message.to_string())
    }

    /// Create an invalid target error.
    pub fn invalid_target(message: impl Into<String>) -> Self {
        Self::InvalidTarget(message.into())
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Whether the error-modal boundary may absorb this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::CmpUnavailable)
    }
}

/// Format a diagnostic with the engine prefix.
pub fn format_error_message(message: impl fmt::Display) -> String {
    format!("{ERROR_PREFIX}: {message}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_errors() {
        assert!(AppError::CmpUnavailable.is_recoverable());
        assert!(AppError::timeout("OneTrust", 50).is_recoverable());
        assert!(!AppError::thumbnail("boom").is_recoverable());
        assert!(!AppError::invalid_target("script").is_recoverable());
    }

    #[test]
    fn test_timeout_message() {
        let err = AppError::timeout("Vimeo SDK", 50);
        assert_eq!(
            err.to_string(),
            "Timed out waiting for Vimeo SDK after 50 attempts"
        );
    }

    #[test]
    fn test_format_error_message() {
        assert_eq!(
            format_error_message("initIframe failed"),
            "MediaConsent: initIframe failed"
        );
    }
}
