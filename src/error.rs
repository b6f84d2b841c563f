//! Error types for doc-translate.
//!
//! Uses `thiserror` for structured error definitions that provide
//! clear context about what went wrong.

use std::path::PathBuf;
use thiserror::Error;

/// Error type for configuration operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read or write the config file
    #[error("Failed to access config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse config file
    #[error("Failed to parse config: {0}")]
    ParseError(String),

    /// Missing required configuration value
    #[error("Missing required config value: {0}")]
    MissingValue(String),

    /// Invalid configuration value
    #[error("Invalid config value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

/// Error type for translation operations.
#[derive(Error, Debug)]
pub enum TranslationError {
    /// HTTP request to API failed
    #[error("API request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// API returned a non-success status
    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    /// Failed to parse API response
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// API answered without any content
    #[error("API returned an empty translation")]
    EmptyResponse,

    /// All retry attempts exhausted
    #[error("All retries exhausted after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },

    /// Invalid API configuration
    #[error("Invalid API configuration: {0}")]
    InvalidConfig(String),
}

/// Error type for filesystem access while scanning and writing documents.
#[derive(Error, Debug)]
pub enum FsError {
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to create directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to stat {}: {source}", .path.display())]
    Metadata {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to list directory {}: {source}", .path.display())]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },
}
