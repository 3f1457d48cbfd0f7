//! Storage module
//!
//! The job store lives in a hosted database reached over its REST API.

pub mod memory;
pub mod rest;

// Re-export store traits from traits module
pub use crate::traits::{ContactDirectory, JobStore};

pub use memory::MemoryStore;
pub use rest::RestStore;
