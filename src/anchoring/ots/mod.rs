//! OpenTimestamps client implementation
//!
//! Bitcoin-backed timestamping using the OpenTimestamps protocol. The proof
//! format comes from `atl_core::ots`; calendars and block explorers are
//! reached over HTTP.

pub mod bitcoin;
pub mod calendar;
pub mod client;
pub mod fixtures;
pub mod mock;
pub mod proof;
pub mod stamper;
pub mod types;

pub use atl_core::ots::{DetachedTimestampFile, Timestamp};
pub use bitcoin::{BlockExplorer, BlockHeader, ChainConfirmation};
pub use client::{OpenTimestampsClient, UpgradeResult};
pub use stamper::{ProofStamper, ProofUpgrade, StampedProof};
pub use types::{OtsConfig, OtsStatus, DEFAULT_CALENDARS, DEFAULT_EXPLORERS};

// Re-export proof utilities for advanced use cases
pub use proof::{
    decode_document_hash, decode_proof, encode_proof, parse_proof, pending_status,
    verify_timestamp,
};
