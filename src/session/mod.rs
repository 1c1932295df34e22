//! # Session Core
//!
//! Everything the workout screen needs that is not UI: the elapsed-time
//! tracker that survives a restart, the durable queue for workouts finished
//! offline, and the service that replays that queue when connectivity returns.
//!
//! ## Layout
//!
//! - `clock.rs`: injectable wall clock
//! - `local_store/`: durable key-value storage (memory and file backed)
//! - `timer.rs`: checkpointed session timer
//! - `offline/`: FIFO of workouts awaiting delivery
//! - `sync/`: connectivity monitor and background replay
//! - `writer.rs`: remote `save_workout` boundary
//! - `controller.rs`: wires the above into start/finish operations
//!
//! Nothing here is a process-wide singleton; the host owns one
//! [`SessionController`] and passes it where it is needed.

pub mod clock;
pub mod controller;
pub mod local_store;
pub mod offline;
pub mod sync;
pub mod timer;
pub mod writer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use controller::{ActiveWorkout, FinishOutcome, SessionController};
pub use local_store::{DurableStore, FileStore, MemoryStore};
pub use offline::{DrainReport, OfflineQueue, QueuedMutation};
pub use sync::{ConnectivityMonitor, ConnectivityState, OfflineSync};
pub use timer::{SessionTimer, StartKind, TimerCheckpoint, Visibility};
pub use writer::{HttpWorkoutWriter, WorkoutWriter};
