//! Error types for NeoGuard

use std::path::PathBuf;

/// Result type alias using NeoGuard's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for NeoGuard operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid or incomplete startup configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// A model, feature-order, or reference artifact could not be loaded
    #[error("artifact error ({}): {reason}", .path.display())]
    Artifact { path: PathBuf, reason: String },

    /// Feature alignment could not produce a usable buffer
    #[error("alignment error: {0}")]
    Alignment(String),

    /// The classifier failed on a batch
    #[error("inference error: {0}")]
    Inference(String),

    /// Inbound record failed range validation
    #[error("invalid input values: {}", .0.join(", "))]
    Validation(Vec<String>),

    /// Filesystem errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new artifact error for the given path
    pub fn artifact(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Artifact {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a new alignment error
    pub fn alignment(msg: impl Into<String>) -> Self {
        Self::Alignment(msg.into())
    }

    /// Create a new inference error
    pub fn inference(msg: impl Into<String>) -> Self {
        Self::Inference(msg.into())
    }

    /// Whether this error must abort startup rather than fail a single request
    pub fn is_startup(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Artifact { .. })
    }
}
