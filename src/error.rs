//! Error types for the application.

use std::path::PathBuf;
use thiserror::Error;

/// Errors related to configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

/// Errors raised by a storage backend.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("could not prepare schema: {0}")]
    Schema(String),
}

/// Errors raised by directory operations.
///
/// The detail strings are shown to the person who issued the command.
#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("{0}")]
    InvalidArgument(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Ambiguous(String),

    #[error("{0}")]
    Duplicate(String),

    #[error("storage failure: {0}")]
    Store(#[from] StoreError),
}

/// Errors related to the message transport.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("connection error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed frame: {0}")]
    Json(#[from] serde_json::Error),

    #[error("connection closed by peer")]
    Closed,

    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("delivery failed: {0}")]
    Delivery(String),
}
