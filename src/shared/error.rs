//! Shared Error Types
//!
//! This module defines the error types used across the session core.
//!
//! # Error Categories
//!
//! - `StoreError` - Durable store failures (never fatal to the tracker or queue)
//! - `DeliveryError` - Remote write failures (the mutation stays queued)
//! - `SessionError` - Errors returned by fallible public operations
//!
//! Configuration errors live next to the configuration types in
//! [`crate::shared::config::ConfigError`].
//!
//! # Usage
//!
//! ```rust
//! use liftlog_session::shared::error::SessionError;
//!
//! let error = SessionError::validation("title", "Workout title cannot be empty");
//! assert!(error.to_string().contains("title"));
//! ```
use thiserror::Error;

use crate::shared::config::ConfigError;

/// Failures of the local durable key-value store
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem failure while touching a key
    #[error("Store I/O error for key '{key}': {source}")]
    Io {
        /// The key being read or written
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// Key contains characters the backend cannot map to storage
    #[error("Invalid store key '{0}'")]
    InvalidKey(String),

    /// Backend is unavailable (closed, quota exceeded, injected failure in tests)
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Create a new I/O error for a key
    pub fn io(key: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            key: key.into(),
            source,
        }
    }

    /// Create a new unavailable error
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }
}

/// Failures reported by a [`WorkoutWriter`](crate::session::writer::WorkoutWriter)
///
/// The core treats every variant as "not delivered".
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// Remote side answered but refused the write
    #[error("Remote rejected workout (status {status}): {message}")]
    Rejected {
        /// HTTP status or writer-specific code
        status: u16,
        /// Human-readable error message
        message: String,
    },

    /// Remote side could not be reached
    #[error("Transport error: {0}")]
    Transport(String),
}

impl DeliveryError {
    /// Create a new rejection error
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            message: message.into(),
        }
    }

    /// Create a new transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }
}

/// Errors returned by the session core's public operations
#[derive(Debug, Error)]
pub enum SessionError {
    /// Durable store failure surfaced to the caller
    #[error(transparent)]
    Store(#[from] StoreError),

    /// JSON serialization or deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Workout payload failed validation
    #[error("Validation error in field '{field}': {message}")]
    Validation {
        /// The field that failed validation
        field: String,
        /// Human-readable error message
        message: String,
    },

    /// A drain pass is already running; this request was dropped
    #[error("A queue drain is already in progress")]
    DrainInProgress,

    /// Operation requires a running workout session
    #[error("No workout session is active")]
    NoActiveSession,

    /// Configuration could not be loaded
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl SessionError {
    /// Create a new validation error
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}
