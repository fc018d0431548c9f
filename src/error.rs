//! Bridge error types.

use std::path::PathBuf;

/// All errors that can occur while talking to the order-management application.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("not connected")]
    NotConnected,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected response: expected {expected}, got '{got}'")]
    Protocol { expected: &'static str, got: String },

    #[error("error response: {0}")]
    ErrorResponse(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
