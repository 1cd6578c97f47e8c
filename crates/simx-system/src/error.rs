//! Error types for loading system structures.

use std::path::PathBuf;

/// Errors raised while reading or validating a system structure document.
#[derive(Debug, thiserror::Error)]
pub enum SystemError {
    /// I/O error reading the structure file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parse error.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parse error.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Structure file not found.
    #[error("system structure file not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// The structure refers to something it does not define.
    #[error("invalid system structure: {detail}")]
    Validation { detail: String },
}

/// Result type for system structure operations.
pub type Result<T> = std::result::Result<T, SystemError>;
