//! Shared Module
//!
//! Types shared by every part of the session core: the workout payload that
//! travels to the remote store, the error taxonomy and the configuration.

/// Finished-workout payload
pub mod workout;

/// Shared error types
pub mod error;

/// Session configuration
pub mod config;

/// Re-export commonly used types for convenience
pub use config::{ConfigError, SessionConfig, SessionConfigBuilder};
pub use error::{DeliveryError, SessionError, StoreError};
pub use workout::{ExerciseLog, SetLog, WorkoutRecord};
