//! Error types for HLS Fetcher
//!
//! This module defines error types for all components of the application.
//! Errors are designed to be actionable and provide clear context for
//! debugging and user feedback. Segment download errors are almost always
//! recovered locally by the retry loop and never surfaced as job failures.

use std::path::PathBuf;
use thiserror::Error;

/// Download and HTTP client errors
#[derive(Error, Debug)]
pub enum DownloadError {
    /// Transport-level failure (connect, TLS, request timeout)
    #[error("HTTP request failed: {0}")]
    Transport(#[source] reqwest::Error),

    /// Server returned a non-success status
    #[error("Server returned HTTP {status} for {url}")]
    Status { status: u16, url: String },

    /// Response body could not be read to completion
    #[error("Failed to read response body: {0}")]
    BodyRead(#[source] reqwest::Error),

    /// Retry ceiling reached for a segment
    #[error("Gave up on segment after {attempts} attempts")]
    AttemptsExhausted { attempts: u32 },

    /// Invalid URL provided
    #[error("Invalid URL: {url} - {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Invalid client or policy configuration
    #[error("Invalid download configuration: {0}")]
    Configuration(String),

    /// I/O error during segment persistence
    #[error("Segment I/O error")]
    Io(#[from] std::io::Error),
}

/// Manifest and input-queue parsing errors
#[derive(Error, Debug)]
pub enum ManifestError {
    /// HTTP request for the manifest failed
    #[error("Manifest request failed")]
    Http(#[from] reqwest::Error),

    /// Server returned a non-success status for the manifest
    #[error("Manifest server returned HTTP {status} for {url}")]
    Status { status: u16, url: String },

    /// Manifest contained no segment references
    #[error("Manifest contains no segments: {url}")]
    Empty { url: String },

    /// Manifest URL could not be parsed
    #[error("Invalid manifest URL: {url}")]
    InvalidUrl { url: String },

    /// Malformed input queue line
    #[error("Invalid input line {line_number}: expected '<url> <id>', got {content:?}")]
    InvalidJobLine { line_number: usize, content: String },

    /// I/O error reading the input queue or writing the manifest file
    #[error("Manifest I/O error")]
    Io(#[from] std::io::Error),
}

/// Reassembly ordering and descriptor errors
#[derive(Error, Debug)]
pub enum AssemblyError {
    /// Gap policy forbids muxing with missing segments
    #[error("{missing} of {total} segments missing from reassembly list")]
    MissingSegments { missing: usize, total: usize },

    /// I/O error writing the concat descriptor
    #[error("Descriptor I/O error: {path}")]
    Descriptor {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// External muxer errors
#[derive(Error, Debug)]
pub enum MuxError {
    /// The muxer binary could not be started
    #[error("Failed to spawn muxer {program:?}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The muxer exited with a non-zero status
    #[error("Muxer exited with status {status:?}")]
    ToolFailed { status: Option<i32>, output: String },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    NotFound { path: PathBuf },

    /// Invalid configuration format
    #[error("Invalid configuration format")]
    InvalidFormat(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration value for {field}: {value}. {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    /// I/O error reading configuration
    #[error("Configuration I/O error")]
    Io(#[from] std::io::Error),
}

/// Top-level application error that can represent any error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Download error
    #[error(transparent)]
    Download(#[from] DownloadError),

    /// Manifest error
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// Assembly error
    #[error(transparent)]
    Assembly(#[from] AssemblyError),

    /// Mux error
    #[error(transparent)]
    Mux(#[from] MuxError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Generic I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Generic application error with context
    #[error("Application error: {message}")]
    Generic { message: String },
}

impl AppError {
    /// Create a generic application error with a message
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Check if the error is recoverable (transient)
    pub fn is_recoverable(&self) -> bool {
        match self {
            AppError::Download(DownloadError::Transport(_))
            | AppError::Download(DownloadError::Status { .. })
            | AppError::Download(DownloadError::BodyRead(_))
            | AppError::Manifest(ManifestError::Http(_))
            | AppError::Manifest(ManifestError::Status { .. }) => true,

            AppError::Download(DownloadError::AttemptsExhausted { .. })
            | AppError::Manifest(ManifestError::InvalidJobLine { .. })
            | AppError::Assembly(AssemblyError::MissingSegments { .. })
            | AppError::Config(_) => false,

            _ => false,
        }
    }

    /// Get error category for logging and metrics
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Download(_) => "download",
            AppError::Manifest(_) => "manifest",
            AppError::Assembly(_) => "assembly",
            AppError::Mux(_) => "mux",
            AppError::Config(_) => "config",
            AppError::Io(_) => "io",
            AppError::Generic { .. } => "generic",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

/// Download result type alias
pub type DownloadResult<T> = std::result::Result<T, DownloadError>;

/// Manifest result type alias
pub type ManifestResult<T> = std::result::Result<T, ManifestError>;

/// Assembly result type alias
pub type AssemblyResult<T> = std::result::Result<T, AssemblyError>;

/// Mux result type alias
pub type MuxResult<T> = std::result::Result<T, MuxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        let err = AppError::Download(DownloadError::AttemptsExhausted { attempts: 3 });
        assert_eq!(err.category(), "download");
        assert!(!err.is_recoverable());

        let err = AppError::Manifest(ManifestError::Empty {
            url: "http://example.com/index.m3u8".to_string(),
        });
        assert_eq!(err.category(), "manifest");
    }

    #[test]
    fn test_recoverable_classification() {
        let err = AppError::Download(DownloadError::Status {
            status: 503,
            url: "http://example.com/seg0.ts".to_string(),
        });
        assert!(err.is_recoverable());

        let err = AppError::Assembly(AssemblyError::MissingSegments {
            missing: 1,
            total: 10,
        });
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_invalid_job_line_display() {
        let err = ManifestError::InvalidJobLine {
            line_number: 3,
            content: "no-identifier".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("line 3"));
        assert!(message.contains("no-identifier"));
    }
}
