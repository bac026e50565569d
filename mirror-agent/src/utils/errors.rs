//! Custom error types for the mirror agent.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MirrorError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Remote API error: status {status} for {url}")]
    Api { status: u16, url: String },

    #[error("No download URL available for {0}")]
    MissingUrl(String),

    #[error("Size mismatch for {path}: expected {expected}, got {actual}")]
    SizeMismatch {
        path: String,
        expected: u64,
        actual: u64,
    },

    #[error("Download failed for {path} after {attempts} attempts")]
    RetriesExhausted { path: String, attempts: u32 },
}

pub type Result<T> = std::result::Result<T, MirrorError>;
