//! # Offline Workout Delivery
//!
//! Keeps finished workouts that could not be saved remotely and replays them
//! when connectivity returns.
//!
//! - `queue.rs`: the durable FIFO and its drain pass
//!
//! Triggering drains automatically is the job of
//! [`OfflineSync`](crate::session::sync::OfflineSync).

pub mod queue;

pub use queue::{DrainReport, OfflineQueue, QueuedMutation};
