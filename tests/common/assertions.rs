//! Custom test assertions for job state

use base64::Engine;
use ots_anchor_worker::anchoring::ots::decode_proof;
use ots_anchor_worker::{AnchorJob, AnchorStatus};

/// Assert that a job was stamped: pending, decodable proof for its hash, no error
pub fn assert_stamped(job: &AnchorJob) {
    assert_eq!(job.anchor_status, AnchorStatus::Pending, "Job should be pending");

    let proof = job.raw_proof.as_deref().expect("Pending job should have raw_proof");
    assert!(!proof.is_empty(), "raw_proof should not be empty");
    assert_base64_format(proof);

    let file = decode_proof(proof).expect("raw_proof should be a valid detached timestamp");
    assert_eq!(
        hex::encode(&file.timestamp.start_digest),
        job.document_hash,
        "Proof should commit to the document hash"
    );

    let metadata = job.metadata.as_ref().expect("Stamped job should have metadata");
    assert!(metadata.contains_key("stampedAt"), "Metadata should have stampedAt");
    assert!(metadata["calendars"].is_array(), "Metadata should list calendars");
    assert!(!metadata.contains_key("stampError"), "Stamped job should have no stampError");
}

/// Assert that a job failed stamping with a recorded error and no proof
pub fn assert_stamp_failed(job: &AnchorJob) {
    assert_eq!(job.anchor_status, AnchorStatus::Failed, "Job should be failed");
    assert!(job.raw_proof.is_none(), "Failed job should have no raw_proof");

    let metadata = job.metadata.as_ref().expect("Failed job should have metadata");
    assert!(
        metadata["stampError"].as_str().is_some_and(|e| !e.is_empty()),
        "Metadata should have a stampError"
    );
    assert!(metadata.contains_key("failedAt"), "Metadata should have failedAt");
}

/// Assert that a value is valid standard base64
pub fn assert_base64_format(value: &str) {
    assert!(
        base64::engine::general_purpose::STANDARD.decode(value).is_ok(),
        "Value should be valid base64, got: {}",
        value
    );
}
