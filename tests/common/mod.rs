//! Common test utilities and fixtures
//!
//! This module provides shared test infrastructure including:
//! - In-memory store and recording mailer wiring
//! - Job builders and mock calendar servers
//! - Custom assertions for job state

#![allow(dead_code)]

pub mod assertions;
pub mod fixtures;

// Re-export commonly used items
pub use assertions::*;
pub use fixtures::*;

// Re-export frequently used external types for convenience
pub use std::sync::Arc;
