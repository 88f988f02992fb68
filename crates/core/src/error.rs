//! Error types for the asset contract

use thiserror::Error;

/// Errors raised by asset conversion and notifier setup.
///
/// Store mutations themselves never fail: absent or duplicate keys are
/// silent no-ops.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("Invalid {kind} JSON: {reason}")]
    InvalidJson { kind: &'static str, reason: String },

    #[error("Notifier runtime error: {0}")]
    Runtime(String),
}

impl AssetError {
    pub fn invalid(kind: &'static str, reason: impl Into<String>) -> Self {
        AssetError::InvalidJson {
            kind,
            reason: reason.into(),
        }
    }
}

/// Result type alias for asset operations
pub type Result<T> = std::result::Result<T, AssetError>;
