//! Worker pipeline tests
//!
//! Real OpenTimestamps client against mock calendars, in-memory job store.

mod common;

use common::*;
use mockito::Matcher;
use ots_anchor_worker::anchoring::ots::fixtures::{
    bitcoin_upgrade_response, test_hash, upgraded_merkle_root,
};
use ots_anchor_worker::anchoring::ots::mock::MockStamper;
use ots_anchor_worker::traits::JobStore;
use ots_anchor_worker::{AnchorStatus, JobOutcome, RunMode};

fn hash_ab() -> (String, [u8; 32]) {
    ("ab".repeat(32), [0xab; 32])
}

// ============================================================================
// STAMP PHASE
// ============================================================================

#[tokio::test]
async fn test_queued_job_is_stamped_with_calendar_proof() {
    let (hash, digest) = hash_ab();
    let (a, mock_a) = pending_calendar(&digest, 1).await;
    let (b, mock_b) = pending_calendar(&digest, 2).await;
    let (c, _) = failing_calendar().await;

    let pipeline = Pipeline::new(calendar_client(&[&a, &b, &c]), vec![queued_job("A1", &hash, 0)]);
    let summary = pipeline.worker(RunMode::Stamp).run().await;

    mock_a.assert_async().await;
    mock_b.assert_async().await;
    assert_eq!(summary.outcome_of("A1"), Some(&JobOutcome::Stamped));

    let job = pipeline.store.job("A1").unwrap();
    assert_stamped(&job);
    assert_eq!(job.metadata.unwrap()["calendars"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_quorum_failure_marks_job_failed() {
    let (hash, digest) = hash_ab();
    let (a, _) = pending_calendar(&digest, 1).await;
    let (b, _) = failing_calendar().await;
    let (c, _) = failing_calendar().await;

    let pipeline = Pipeline::new(calendar_client(&[&a, &b, &c]), vec![queued_job("A1", &hash, 0)]);
    let summary = pipeline.worker(RunMode::Stamp).run().await;

    match summary.outcome_of("A1") {
        Some(JobOutcome::StampFailed { error }) => assert!(error.contains("calendar attestations")),
        other => panic!("Expected StampFailed, got {other:?}"),
    }
    assert_stamp_failed(&pipeline.store.job("A1").unwrap());
}

#[tokio::test]
async fn test_stamped_xor_failed_for_every_job() {
    let (hash, digest) = hash_ab();
    let (a, _) = pending_calendar(&digest, 1).await;
    let (b, _) = pending_calendar(&digest, 2).await;

    let pipeline = Pipeline::new(
        calendar_client(&[&a, &b]),
        vec![
            queued_job("good", &hash, 0),
            queued_job("short", "abcd", 1),
            queued_job("not-hex", &"zz".repeat(32), 2),
        ],
    );
    pipeline.worker(RunMode::Stamp).run().await;

    assert_stamped(&pipeline.store.job("good").unwrap());
    assert_stamp_failed(&pipeline.store.job("short").unwrap());
    assert_stamp_failed(&pipeline.store.job("not-hex").unwrap());
    assert!(pipeline
        .store
        .fetch_by_status(AnchorStatus::Queued, 10)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_stamp_respects_limit_and_order() {
    let stamper = Arc::new(MockStamper::new());
    let jobs = (0..7)
        .map(|i| queued_job(&format!("J{i}"), &"cd".repeat(32), 10 - i))
        .collect();
    let pipeline = Pipeline::new(stamper.clone(), jobs);

    let summary = pipeline.worker(RunMode::Stamp).run().await;

    let processed: Vec<_> = summary
        .stamp
        .unwrap()
        .jobs
        .into_iter()
        .map(|r| r.job_id)
        .collect();
    // Oldest created_at first: J6 was created earliest
    assert_eq!(processed, vec!["J6", "J5", "J4", "J3", "J2"]);
    assert_eq!(stamper.stamp_calls(), 5);
    assert_eq!(
        pipeline
            .store
            .fetch_by_status(AnchorStatus::Queued, 10)
            .await
            .unwrap()
            .len(),
        2
    );
}

// ============================================================================
// FOLLOW-UP PHASE
// ============================================================================

#[tokio::test]
async fn test_full_run_stamps_then_notifies_once() {
    let (hash, digest) = hash_ab();
    let (a, _) = pending_calendar(&digest, 1).await;
    let (b, _) = pending_calendar(&digest, 2).await;

    let pipeline = Pipeline::new(calendar_client(&[&a, &b]), vec![queued_job("A1", &hash, 0)]);

    let first = pipeline.worker(RunMode::Both).run().await;
    assert_eq!(first.emails_sent(), 1);

    let sent = pipeline.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, vec![OWNER_EMAIL.to_string()]);
    assert!(sent[0].html.contains("A1"));
    assert!(sent[0].html.contains("abababababababab...abababab"));

    let job = pipeline.store.job("A1").unwrap();
    assert!(job.is_notified());
    assert_stamped(&job);

    let second = pipeline.worker(RunMode::Followup).run().await;
    assert_eq!(second.outcome_of("A1"), None);
    assert_eq!(pipeline.mailer.sent().len(), 1);
}

#[tokio::test]
async fn test_failed_jobs_are_never_notified() {
    let pipeline = Pipeline::new(
        Arc::new(MockStamper::failing()),
        vec![queued_job("A1", &"ab".repeat(32), 0)],
    );

    let summary = pipeline.worker(RunMode::Both).run().await;

    assert_eq!(summary.emails_sent(), 0);
    assert!(summary.followup.unwrap().jobs.is_empty());
    assert!(pipeline.mailer.sent().is_empty());
}

#[tokio::test]
async fn test_confirmation_required_flow() {
    let stamper = Arc::new(MockStamper::with_confirmation(840_000));
    let pipeline = Pipeline::new(stamper.clone(), vec![queued_job("A1", &"ab".repeat(32), 0)]);

    let summary = pipeline
        .worker_with(ots_anchor_worker::RunConfig {
            mode: RunMode::Both,
            phase_pause: std::time::Duration::ZERO,
            require_confirmation: true,
            ..ots_anchor_worker::RunConfig::default()
        })
        .run()
        .await;

    assert!(matches!(
        summary.outcome_of("A1"),
        Some(JobOutcome::Confirmed {
            block_height: 840_000,
            ..
        })
    ));
    let job = pipeline.store.job("A1").unwrap();
    assert_eq!(job.anchor_status, AnchorStatus::Confirmed);
    assert!(job.is_notified());
    assert_eq!(pipeline.mailer.sent().len(), 1);
    assert_eq!(stamper.upgrade_calls(), 1);
}

// ============================================================================
// CHAIN-CHECKED CONFIRMATION
// ============================================================================

/// Commitment a mock calendar answers with: sha256(digest || nonce)
fn calendar_commitment(digest: &[u8; 32], nonce: u8) -> [u8; 32] {
    let mut message = digest.to_vec();
    message.push(nonce);
    test_hash(&message)
}

fn confirming_run() -> ots_anchor_worker::RunConfig {
    ots_anchor_worker::RunConfig {
        mode: RunMode::Both,
        phase_pause: std::time::Duration::ZERO,
        require_confirmation: true,
        ..ots_anchor_worker::RunConfig::default()
    }
}

#[tokio::test]
async fn test_confirmation_records_block_time() {
    let (hash, digest) = hash_ab();
    let (mut a, _) = pending_calendar(&digest, 1).await;
    let (mut b, _) = pending_calendar(&digest, 2).await;
    let commitment = calendar_commitment(&digest, 1);

    let upgrade = a
        .mock("GET", format!("/timestamp/{}", hex::encode(commitment)).as_str())
        .with_status(200)
        .with_body(bitcoin_upgrade_response(850_000))
        .create_async()
        .await;
    b.mock("GET", Matcher::Any).with_status(404).create_async().await;
    let explorer =
        explorer_with_block(850_000, &upgraded_merkle_root(&commitment), 1_719_000_000).await;

    let pipeline = Pipeline::new(
        calendar_client_with_explorer(&[&a, &b], &explorer),
        vec![queued_job("A1", &hash, 0)],
    );
    let summary = pipeline.worker_with(confirming_run()).run().await;

    upgrade.assert_async().await;
    assert!(matches!(
        summary.outcome_of("A1"),
        Some(JobOutcome::Confirmed {
            block_height: 850_000,
            ..
        })
    ));

    let job = pipeline.store.job("A1").unwrap();
    assert_eq!(job.anchor_status, AnchorStatus::Confirmed);
    assert!(job.is_notified());
    let metadata = job.metadata.unwrap();
    let confirmed_at = chrono::DateTime::parse_from_rfc3339(
        metadata["confirmedAt"].as_str().unwrap(),
    )
    .unwrap();
    assert_eq!(confirmed_at.timestamp(), 1_719_000_000);
    assert_eq!(metadata["bitcoinBlockHeight"], 850_000);
}

#[tokio::test]
async fn test_attestation_not_in_block_stays_pending() {
    let (hash, digest) = hash_ab();
    let (mut a, _) = pending_calendar(&digest, 1).await;
    let (mut b, _) = pending_calendar(&digest, 2).await;
    let commitment = calendar_commitment(&digest, 1);

    a.mock("GET", format!("/timestamp/{}", hex::encode(commitment)).as_str())
        .with_status(200)
        .with_body(bitcoin_upgrade_response(850_001))
        .create_async()
        .await;
    b.mock("GET", Matcher::Any).with_status(404).create_async().await;
    let explorer = explorer_with_block(850_001, &"00".repeat(32), 1_719_000_600).await;

    let pipeline = Pipeline::new(
        calendar_client_with_explorer(&[&a, &b], &explorer),
        vec![queued_job("A1", &hash, 0)],
    );
    let summary = pipeline.worker_with(confirming_run()).run().await;

    assert!(summary.outcome_of("A1").unwrap().is_error());
    let job = pipeline.store.job("A1").unwrap();
    assert_eq!(job.anchor_status, AnchorStatus::Pending);
    assert!(!job.is_notified());
    assert!(pipeline.mailer.sent().is_empty());
}
