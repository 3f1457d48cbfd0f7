//! ots-anchor-worker library exports (for testing)

pub mod anchoring;
pub mod config;
pub mod error;
pub mod notify;
pub mod storage;
pub mod traits;
pub mod worker;

// Re-exports
pub use config::{RunConfig, RunMode, WorkerConfig};
pub use traits::{AnchorJob, AnchorStatus, ContactDirectory, JobPatch, JobStore, Mailer};
pub use worker::{AnchorWorker, JobOutcome, RunSummary};
