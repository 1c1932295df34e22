//! Common test utilities and helpers
//!
//! - Scripted workout writers
//! - Record and controller fixtures
//! - Custom assertion macros

pub mod assertions;
pub mod fixtures;
pub mod writers;

pub use fixtures::*;
pub use writers::*;
