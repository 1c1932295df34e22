//! Test suite for the LiftLog session core
//!
//! This module organizes all tests

pub mod common;
pub mod property;
