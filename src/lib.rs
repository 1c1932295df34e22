//! LiftLog Session - Workout Session Core
//!
//! Offline-tolerant core of a workout-tracking client: it times the active
//! session across restarts and guarantees a finished workout eventually
//! reaches the remote store, even when it was finished without a network.
//!
//! # Module Structure
//!
//! - **`shared`** - Types used across the crate
//!   - The `WorkoutRecord` payload and its validation
//!   - Error types
//!   - Configuration (TOML file, builder, environment overrides)
//!
//! - **`session`** - The session core
//!   - Checkpointed session timer
//!   - Durable offline queue with at-least-once, FIFO delivery
//!   - Connectivity monitor and background replay
//!   - HTTP writer and the `SessionController` that ties them together
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use liftlog_session::session::{HttpWorkoutWriter, SessionController};
//! use liftlog_session::shared::SessionConfig;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SessionConfig::from_env()?;
//! let writer = Arc::new(HttpWorkoutWriter::new(&config)?);
//! let mut controller = SessionController::open(config, writer)?;
//! controller.start_background_sync();
//!
//! controller.start_workout("Pull day", None);
//! // ... later
//! let outcome = controller.finish_workout(Vec::new(), None).await?;
//! println!("saved remotely: {}", outcome.is_saved());
//! # Ok(())
//! # }
//! ```
//!
//! # Thread Safety
//!
//! - Shared state sits behind `std::sync::Mutex`; no lock is held across an `.await`
//! - Timer repaints and connectivity changes are published on `tokio::sync::watch`
//! - At most one queue drain runs at a time

/// Shared types and data structures
pub mod shared;

/// Timer, offline queue and sync service
pub mod session;
