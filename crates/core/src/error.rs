//! Error types for the core crate.

use thiserror::Error;

/// Core error type.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Invalid base64 payload.
    #[error("Invalid base64 encoding: {0}")]
    InvalidBase64(String),

    /// Invalid base58 payload.
    #[error("Invalid base58 encoding: {0}")]
    InvalidBase58(String),

    /// Invalid hex payload.
    #[error("Invalid hex encoding")]
    InvalidHex,
}

/// Result type alias for CoreError.
pub type Result<T> = std::result::Result<T, CoreError>;
