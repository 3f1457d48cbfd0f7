//! Anchoring implementations

pub mod error;
pub mod ots;

pub use error::AnchorError;
pub use ots::*;
