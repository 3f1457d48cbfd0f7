//! Trait definitions for the job store and email delivery

pub mod mailer;
pub mod store;

// Re-export all types
pub use mailer::{EmailMessage, Mailer};
pub use store::{
    meta, timestamp, AnchorJob, AnchorStatus, ContactDirectory, JobPatch, JobStore, Metadata,
};
