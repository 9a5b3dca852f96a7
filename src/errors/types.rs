//! Error type definitions for tvlink

use thiserror::Error;

/// Top-level application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Missing or invalid run settings (fatal)
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Source loading errors
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// Output or log file errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client construction errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Errors raised while loading the raw text of a playlist source
#[derive(Error, Debug)]
pub enum SourceError {
    /// Remote source could not be reached
    #[error("Source unreachable: {source_name} ({message})")]
    Unreachable {
        source_name: String,
        message: String,
    },

    /// Remote source answered with a non-success status
    #[error("HTTP error: {status} - {source_name}")]
    Http { status: u16, source_name: String },

    /// Local file could not be read
    #[error("Read failed: {path} ({message})")]
    ReadFailed { path: String, message: String },
}

impl AppError {
    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

impl SourceError {
    /// Create an unreachable-source error
    pub fn unreachable<S: Into<String>, M: Into<String>>(source_name: S, message: M) -> Self {
        Self::Unreachable {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Create an HTTP status error
    pub fn http<S: Into<String>>(status: u16, source_name: S) -> Self {
        Self::Http {
            status,
            source_name: source_name.into(),
        }
    }

    /// Create a file read error
    pub fn read_failed<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::ReadFailed {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Whether the failure came from a local file rather than the network
    pub fn is_read_failure(&self) -> bool {
        matches!(self, Self::ReadFailed { .. })
    }
}
