//! Error types for pinpoll
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

/// All error types that can occur in pinpoll
#[derive(Debug, Error)]
pub enum PinpollError {
    /// Startup configuration is unusable (no tokens, mismatched lists, bad proxy)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A remote call failed at the transport or HTTP status level
    #[error("{call} failed: {cause}")]
    Transport { call: &'static str, cause: String },

    /// A remote call returned a body that could not be decoded
    #[error("{call} returned an undecodable body: {cause}")]
    Decoding { call: &'static str, cause: String },
}

impl PinpollError {
    pub fn transport(call: &'static str, cause: impl ToString) -> Self {
        PinpollError::Transport {
            call,
            cause: cause.to_string(),
        }
    }

    pub fn decoding(call: &'static str, cause: impl ToString) -> Self {
        PinpollError::Decoding {
            call,
            cause: cause.to_string(),
        }
    }

    /// Only configuration errors stop startup; everything else is logged and absorbed.
    pub fn is_fatal(&self) -> bool {
        matches!(self, PinpollError::Configuration(_))
    }
}

/// Result type alias for pinpoll operations
pub type Result<T> = std::result::Result<T, PinpollError>;
