// src/error.rs

//! Unified error handling for the ticker crawler.

use std::fmt;

use thiserror::Error;

/// Result type alias for crawler operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
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

    /// Zip archive could not be written
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Currency pair not in the supported list
    #[error("Unsupported currency pair '{pair}' (supported: {supported})")]
    UnsupportedPair { pair: String, supported: String },

    /// Archiving a day file failed
    #[error("Archive error for {day}: {message}")]
    Archive { day: String, message: String },
}

impl AppError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create an unsupported pair error.
    pub fn unsupported_pair(pair: impl Into<String>, supported: &[String]) -> Self {
        Self::UnsupportedPair {
            pair: pair.into(),
            supported: supported.join(", "),
        }
    }

    /// Create an archive error with the day it concerns.
    pub fn archive(day: impl fmt::Display, message: impl fmt::Display) -> Self {
        Self::Archive {
            day: day.to_string(),
            message: message.to_string(),
        }
    }

    /// Process exit code for this error.
    ///
    /// An unknown pair is an invalid argument (9); everything else is a
    /// generic failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::UnsupportedPair { .. } => 9,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_pair_lists_supported() {
        let err = AppError::unsupported_pair("doge_krw", &["btc_krw".into(), "eth_krw".into()]);
        assert_eq!(
            err.to_string(),
            "Unsupported currency pair 'doge_krw' (supported: btc_krw, eth_krw)"
        );
        assert_eq!(err.exit_code(), 9);
    }

    #[test]
    fn other_errors_exit_with_one() {
        assert_eq!(AppError::config("bad").exit_code(), 1);
        assert_eq!(AppError::archive("2026-01-01", "missing").exit_code(), 1);
    }
}
