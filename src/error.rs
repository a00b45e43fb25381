// src/error.rs

//! Unified error handling for the chef pipeline.

use std::fmt;

use thiserror::Error;

/// Result type alias for pipeline operations.
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

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Required credential or service location is absent
    #[error("Missing credential: {0}")]
    MissingCredential(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Page structure did not match what the crawler expects
    #[error("Crawl error for {context}: {message}")]
    Crawl { context: String, message: String },

    /// Remote resource could not be retrieved (retries exhausted or non-2xx)
    #[error("Resource unavailable: {0}")]
    Unavailable(String),

    /// Content provider answered with something we cannot use
    #[error("Provider error from {provider}: {message}")]
    Provider { provider: String, message: String },

    /// Document conversion failed
    #[error("Conversion error for {path}: {message}")]
    Conversion { path: String, message: String },

    /// Checkpoint file is missing, of the wrong version/stage, or violates tree invariants
    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    /// A node kind the loader does not know reached the load stage
    #[error("Unknown node kind under '{parent}'")]
    UnknownKind { parent: String },
}

impl AppError {
    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a crawl error with context.
    pub fn crawl(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Crawl {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Create an unavailable-resource error.
    pub fn unavailable(url: impl Into<String>) -> Self {
        Self::Unavailable(url.into())
    }

    /// Create a provider error.
    pub fn provider(provider: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.to_string(),
        }
    }

    /// Create a conversion error.
    pub fn conversion(path: impl fmt::Display, message: impl fmt::Display) -> Self {
        Self::Conversion {
            path: path.to_string(),
            message: message.to_string(),
        }
    }

    /// Create a checkpoint error.
    pub fn checkpoint(message: impl Into<String>) -> Self {
        Self::Checkpoint(message.into())
    }

    /// Whether a stage should log this error and skip the affected node
    /// instead of aborting the whole traversal.
    pub fn is_skippable(&self) -> bool {
        matches!(
            self,
            Self::Unavailable(_) | Self::Provider { .. } | Self::Conversion { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skippable_errors() {
        assert!(AppError::unavailable("https://example.com").is_skippable());
        assert!(AppError::provider("box", "bad json").is_skippable());
        assert!(AppError::conversion("a.docx", "500").is_skippable());
    }

    #[test]
    fn test_fatal_errors() {
        assert!(!AppError::checkpoint("bad version").is_skippable());
        assert!(
            !AppError::UnknownKind {
                parent: "root".into()
            }
            .is_skippable()
        );
        assert!(!AppError::MissingCredential("token".into()).is_skippable());
    }
}
