//! OTS proof inspection, verification and storage encoding

use crate::anchoring::error::AnchorError;
use crate::anchoring::ots::types::OtsStatus;
use atl_core::ots::{Attestation, DetachedTimestampFile, Step, StepData, Timestamp};
use base64::Engine;

/// Decode a hex document hash into a SHA-256 digest
pub fn decode_document_hash(document_hash: &str) -> Result<[u8; 32], AnchorError> {
    let bytes = hex::decode(document_hash.trim())
        .map_err(|e| AnchorError::InvalidHash(format!("{document_hash:?}: {e}")))?;
    <[u8; 32]>::try_from(bytes.as_slice()).map_err(|_| {
        AnchorError::InvalidHash(format!("expected 32 bytes, got {}", bytes.len()))
    })
}

/// Collect all attestations from a timestamp tree with the message each attests
fn collect_attestations(step: &Step) -> Vec<(&[u8], &Attestation)> {
    match &step.data {
        StepData::Attestation(att) => vec![(step.output.as_slice(), att)],
        StepData::Op(_) | StepData::Fork => {
            step.next.iter().flat_map(collect_attestations).collect()
        }
    }
}

/// Find pending attestations as (calendar_url, commitment) pairs
///
/// The commitment is the step output the pending attestation sits on - this
/// is what the calendar server uses to look up the completed timestamp.
pub fn find_pending_attestations(timestamp: &Timestamp) -> Vec<(String, Vec<u8>)> {
    collect_attestations(&timestamp.first_step)
        .into_iter()
        .filter_map(|(msg, att)| match att {
            Attestation::Pending { uri } => Some((uri.clone(), msg.to_vec())),
            _ => None,
        })
        .collect()
}

/// Whether any Bitcoin attestation is present (claimed, not yet checked)
pub fn has_bitcoin_attestation(timestamp: &Timestamp) -> bool {
    collect_attestations(&timestamp.first_step)
        .iter()
        .any(|(_, att)| att.is_bitcoin())
}

/// Pending status listing every calendar still holding a commitment
pub fn pending_status(timestamp: &Timestamp) -> OtsStatus {
    OtsStatus::Pending {
        calendar_urls: find_pending_attestations(timestamp)
            .into_iter()
            .map(|(uri, _)| uri)
            .collect(),
    }
}

/// Verify proof structure and hash commitment
pub fn verify_timestamp(
    file: &DetachedTimestampFile,
    expected_hash: &[u8; 32],
) -> Result<(), AnchorError> {
    if file.timestamp.start_digest.as_slice() != expected_hash.as_slice() {
        return Err(AnchorError::ProofInvalid(
            "timestamp digest does not match expected hash".into(),
        ));
    }

    if collect_attestations(&file.timestamp.first_step).is_empty() {
        return Err(AnchorError::ProofInvalid(
            "timestamp has no attestations".into(),
        ));
    }

    Ok(())
}

/// Parse OTS proof bytes into DetachedTimestampFile
pub fn parse_proof(proof_bytes: &[u8]) -> Result<DetachedTimestampFile, AnchorError> {
    DetachedTimestampFile::from_bytes(proof_bytes).map_err(AnchorError::from)
}

/// Serialize a proof and base64-encode it for the `raw_proof` column
pub fn encode_proof(file: &DetachedTimestampFile) -> Result<String, AnchorError> {
    let bytes = file.to_bytes()?;
    Ok(base64::engine::general_purpose::STANDARD.encode(bytes))
}

/// Decode a `raw_proof` column value
pub fn decode_proof(proof_base64: &str) -> Result<DetachedTimestampFile, AnchorError> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(proof_base64.trim())
        .map_err(|e| AnchorError::ProofEncoding(e.to_string()))?;
    parse_proof(&bytes)
}
