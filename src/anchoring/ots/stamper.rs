//! Proof stamping seam used by the worker
//!
//! The worker only deals in hex hashes and base64 proofs; everything below
//! this trait is OpenTimestamps detail.

use crate::anchoring::error::AnchorError;
use crate::anchoring::ots::client::OpenTimestampsClient;
use crate::anchoring::ots::proof::{
    decode_document_hash, decode_proof, encode_proof, verify_timestamp,
};
use crate::anchoring::ots::types::OtsStatus;
use async_trait::async_trait;

/// A freshly stamped proof ready to be stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StampedProof {
    /// Base64 of the serialized detached timestamp file
    pub proof_base64: String,
    /// Calendars the digest was submitted to
    pub calendars: Vec<String>,
}

/// Result of asking the calendars for an upgrade
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofUpgrade {
    /// New proof, present only if a calendar contributed something
    pub proof_base64: Option<String>,
    /// Status after upgrade (Pending or Confirmed)
    pub status: OtsStatus,
}

/// Turns document hashes into proofs and upgrades pending ones
#[async_trait]
pub trait ProofStamper: Send + Sync {
    /// Timestamp a hex-encoded SHA-256 document hash
    async fn stamp(&self, document_hash: &str) -> Result<StampedProof, AnchorError>;

    /// Try to complete a stored proof with Bitcoin attestations
    async fn upgrade(&self, proof_base64: &str) -> Result<ProofUpgrade, AnchorError>;
}

#[async_trait]
impl ProofStamper for OpenTimestampsClient {
    async fn stamp(&self, document_hash: &str) -> Result<StampedProof, AnchorError> {
        let digest = decode_document_hash(document_hash)?;
        let file = OpenTimestampsClient::stamp(self, &digest).await?;
        let proof_base64 = encode_proof(&file)?;

        // What gets stored must decode back to a proof for this document
        verify_timestamp(&decode_proof(&proof_base64)?, &digest)?;

        Ok(StampedProof {
            proof_base64,
            calendars: self.config().calendar_urls.clone(),
        })
    }

    async fn upgrade(&self, proof_base64: &str) -> Result<ProofUpgrade, AnchorError> {
        let file = decode_proof(proof_base64)?;
        let result = OpenTimestampsClient::upgrade(self, &file).await?;

        let proof_base64 = if result.changed {
            Some(encode_proof(&result.file)?)
        } else {
            None
        };

        Ok(ProofUpgrade {
            proof_base64,
            status: result.status,
        })
    }
}
