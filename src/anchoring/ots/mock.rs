//! Mock proof stamper for testing
//!
//! Produces real, parseable proofs without touching the network, so tests of
//! the worker can decode whatever ends up in `raw_proof`.

use super::proof::{decode_document_hash, decode_proof, encode_proof, pending_status};
use super::stamper::{ProofStamper, ProofUpgrade, StampedProof};
use super::types::OtsStatus;
use crate::anchoring::error::AnchorError;
use async_trait::async_trait;
use atl_core::ots::{Attestation, Op, Step, StepData, TimestampBuilder};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Block time reported for mock confirmations (2023-11-14T22:13:20Z)
pub const MOCK_BLOCK_TIME: i64 = 1_700_000_000;

/// Mock stamper for testing
///
/// Configurable responses for stamp and upgrade operations.
pub struct MockStamper {
    /// Whether stamp should fail
    pub stamp_should_fail: AtomicBool,

    /// Whether upgrade adds a Bitcoin attestation
    pub upgrade_is_confirmed: AtomicBool,

    /// Block height to return on confirmation
    pub confirmed_block_height: u64,

    /// Calendar URL written into pending attestations
    pub calendar_url: String,

    /// Count of stamp calls
    pub stamp_call_count: AtomicUsize,

    /// Count of upgrade calls
    pub upgrade_call_count: AtomicUsize,
}

impl Default for MockStamper {
    fn default() -> Self {
        Self {
            stamp_should_fail: AtomicBool::new(false),
            upgrade_is_confirmed: AtomicBool::new(false),
            confirmed_block_height: 800_000,
            calendar_url: "https://mock.calendar".to_string(),
            stamp_call_count: AtomicUsize::new(0),
            upgrade_call_count: AtomicUsize::new(0),
        }
    }
}

impl MockStamper {
    /// Create a new mock stamper with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock that always fails on stamp
    pub fn failing() -> Self {
        Self {
            stamp_should_fail: AtomicBool::new(true),
            ..Self::default()
        }
    }

    /// Create a mock that confirms proofs on upgrade
    pub fn with_confirmation(block_height: u64) -> Self {
        Self {
            upgrade_is_confirmed: AtomicBool::new(true),
            confirmed_block_height: block_height,
            ..Self::default()
        }
    }

    /// Get number of stamp calls
    pub fn stamp_calls(&self) -> usize {
        self.stamp_call_count.load(Ordering::SeqCst)
    }

    /// Get number of upgrade calls
    pub fn upgrade_calls(&self) -> usize {
        self.upgrade_call_count.load(Ordering::SeqCst)
    }
}

/// Build a pending proof for `digest`: prepend "mock", sha256, pending(uri)
pub fn fake_pending_proof(digest: &[u8; 32], calendar_url: &str) -> Result<String, AnchorError> {
    let file = TimestampBuilder::new(*digest)
        .prepend(b"mock")
        .sha256()
        .add_pending_attestation(calendar_url)
        .build_timestamp()?;
    encode_proof(&file)
}

/// Replace each pending leaf with sha256 then a Bitcoin attestation at `height`
fn attest_pending(step: &mut Step, height: u64) {
    if matches!(step.data, StepData::Attestation(Attestation::Pending { .. })) {
        let output = Op::Sha256.execute(&step.output);
        *step = Step {
            data: StepData::Op(Op::Sha256),
            output: output.clone(),
            next: vec![Step {
                data: StepData::Attestation(Attestation::Bitcoin { height }),
                output,
                next: vec![],
            }],
        };
        return;
    }
    for next in &mut step.next {
        attest_pending(next, height);
    }
}

#[async_trait]
impl ProofStamper for MockStamper {
    async fn stamp(&self, document_hash: &str) -> Result<StampedProof, AnchorError> {
        self.stamp_call_count.fetch_add(1, Ordering::SeqCst);

        if self.stamp_should_fail.load(Ordering::SeqCst) {
            return Err(AnchorError::QuorumNotReached {
                required: 2,
                received: 0,
                details: "mock stamp failure".into(),
            });
        }

        let digest = decode_document_hash(document_hash)?;
        Ok(StampedProof {
            proof_base64: fake_pending_proof(&digest, &self.calendar_url)?,
            calendars: vec![self.calendar_url.clone()],
        })
    }

    async fn upgrade(&self, proof_base64: &str) -> Result<ProofUpgrade, AnchorError> {
        self.upgrade_call_count.fetch_add(1, Ordering::SeqCst);

        let mut file = decode_proof(proof_base64)?;

        if !self.upgrade_is_confirmed.load(Ordering::SeqCst) {
            return Ok(ProofUpgrade {
                proof_base64: None,
                status: pending_status(&file.timestamp),
            });
        }

        let block_time = DateTime::<Utc>::from_timestamp(MOCK_BLOCK_TIME, 0)
            .ok_or_else(|| AnchorError::InvalidResponse("mock block time out of range".into()))?;
        attest_pending(&mut file.timestamp.first_step, self.confirmed_block_height);

        Ok(ProofUpgrade {
            proof_base64: Some(encode_proof(&file)?),
            status: OtsStatus::Confirmed {
                block_height: self.confirmed_block_height,
                block_time,
            },
        })
    }
}
