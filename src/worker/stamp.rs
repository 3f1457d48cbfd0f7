//! Stamp phase
//!
//! Submits queued jobs to the calendars and stores the resulting proof.

use chrono::Utc;

use super::outcome::{JobOutcome, Phase, PhaseReport};
use crate::anchoring::ots::ProofStamper;
use crate::traits::{AnchorJob, AnchorStatus, JobPatch, JobStore};

/// Stamp up to `limit` queued jobs, oldest first
pub async fn stamp_queued_jobs(
    store: &dyn JobStore,
    stamper: &dyn ProofStamper,
    limit: usize,
) -> PhaseReport {
    let queued = match store.fetch_by_status(AnchorStatus::Queued, limit).await {
        Ok(jobs) => jobs,
        Err(e) => {
            tracing::error!(error = %e, "Failed to fetch queued anchors");
            return PhaseReport::aborted(Phase::Stamp, e.to_string());
        }
    };

    let mut report = PhaseReport::new(Phase::Stamp);

    if queued.is_empty() {
        tracing::info!("No queued anchors found");
        return report;
    }

    tracing::info!(count = queued.len(), "Processing queued anchors");

    for job in &queued {
        let outcome = stamp_job(store, stamper, job).await;
        report.push(&job.id, outcome);
    }

    report
}

/// Stamp one job and write the result back
///
/// A stamping error is recorded on the job as `failed`, never left queued.
pub async fn stamp_job(
    store: &dyn JobStore,
    stamper: &dyn ProofStamper,
    job: &AnchorJob,
) -> JobOutcome {
    tracing::info!(
        job_id = %job.id,
        hash_prefix = %job.document_hash.get(..16).unwrap_or(&job.document_hash),
        "Stamping anchor"
    );

    let (patch, outcome) = match stamper.stamp(&job.document_hash).await {
        Ok(stamped) => (
            JobPatch::stamped(job, stamped.proof_base64, &stamped.calendars, Utc::now()),
            JobOutcome::Stamped,
        ),
        Err(e) => {
            tracing::warn!(job_id = %job.id, error = %e, "Failed to stamp anchor");
            let error = e.to_string();
            (
                JobPatch::stamp_failed(job, &error, Utc::now()),
                JobOutcome::StampFailed { error },
            )
        }
    };

    if let Err(e) = store.update(&job.id, &patch).await {
        tracing::error!(job_id = %job.id, error = %e, "Failed to record stamp result");
        return JobOutcome::Error {
            error: e.to_string(),
        };
    }

    if outcome == JobOutcome::Stamped {
        tracing::info!(job_id = %job.id, "Stored OpenTimestamps proof");
    }

    outcome
}
