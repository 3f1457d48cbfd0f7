//! Follow-up phase
//!
//! Sweeps pending jobs and notifies their owners. By default a pending job
//! counts as complete; with confirmation required, the stored proof is first
//! upgraded through the calendars and only jobs whose Bitcoin attestation
//! matches its block are confirmed and notified.
//!
//! Confirmed jobs whose email never went out (mailer down, no recipient)
//! are retried first, whatever the mode.

use chrono::Utc;

use super::outcome::{JobOutcome, Phase, PhaseReport};
use crate::anchoring::ots::{OtsStatus, ProofStamper};
use crate::error::StoreError;
use crate::notify::{NotifyOutcome, Notifier};
use crate::traits::{AnchorJob, AnchorStatus, JobPatch, JobStore};

/// Follow up on up to `limit` jobs per status, oldest first
pub async fn follow_up_pending_jobs(
    store: &dyn JobStore,
    stamper: &dyn ProofStamper,
    notifier: &Notifier,
    limit: usize,
    require_confirmation: bool,
) -> PhaseReport {
    let mut report = PhaseReport::new(Phase::Followup);

    let unnotified = match store.fetch_unnotified(AnchorStatus::Confirmed, limit).await {
        Ok(jobs) => jobs,
        Err(e) => {
            tracing::error!(error = %e, "Failed to fetch confirmed anchors");
            return PhaseReport::aborted(Phase::Followup, e.to_string());
        }
    };

    if !unnotified.is_empty() {
        tracing::info!(
            count = unnotified.len(),
            "Retrying notification for confirmed anchors"
        );
    }
    for job in &unnotified {
        report.push(&job.id, notify_job(store, notifier, job).await);
    }

    // Upgrading needs every pending proof; plain notification only the unsent ones
    let fetched = if require_confirmation {
        store.fetch_by_status(AnchorStatus::Pending, limit).await
    } else {
        store.fetch_unnotified(AnchorStatus::Pending, limit).await
    };
    let pending = match fetched {
        Ok(jobs) => jobs,
        Err(e) => {
            tracing::error!(error = %e, "Failed to fetch pending anchors");
            report.fetch_error = Some(e.to_string());
            return report;
        }
    };

    if pending.is_empty() {
        tracing::info!("No pending anchors to follow up on");
        return report;
    }

    if require_confirmation {
        tracing::info!(count = pending.len(), "Checking pending anchors for Bitcoin confirmation");
    } else {
        tracing::warn!(
            count = pending.len(),
            "Notifying pending anchors without verifying Bitcoin confirmation"
        );
    }

    for job in &pending {
        let outcome = if require_confirmation {
            confirm_job(store, stamper, notifier, job).await
        } else {
            notify_job(store, notifier, job).await
        };
        report.push(&job.id, outcome);
    }

    report
}

/// Send the completion email for a job and record it
pub async fn notify_job(store: &dyn JobStore, notifier: &Notifier, job: &AnchorJob) -> JobOutcome {
    match send_and_record(store, notifier, job).await {
        Ok(notification) => JobOutcome::Notification(notification),
        Err(e) => JobOutcome::Error {
            error: e.to_string(),
        },
    }
}

/// Upgrade a job's proof; confirm and notify once Bitcoin-attested
pub async fn confirm_job(
    store: &dyn JobStore,
    stamper: &dyn ProofStamper,
    notifier: &Notifier,
    job: &AnchorJob,
) -> JobOutcome {
    let Some(proof) = job.raw_proof.as_deref() else {
        tracing::warn!(job_id = %job.id, "Pending anchor has no stored proof");
        return JobOutcome::Error {
            error: "pending anchor has no stored proof".into(),
        };
    };

    let upgrade = match stamper.upgrade(proof).await {
        Ok(upgrade) => upgrade,
        Err(e) => {
            tracing::warn!(job_id = %job.id, error = %e, "OTS upgrade failed, will retry");
            return JobOutcome::Error {
                error: e.to_string(),
            };
        }
    };

    match upgrade.status {
        OtsStatus::Confirmed {
            block_height,
            block_time,
        } => {
            // Written before the email; an unsent email is retried by the confirmed sweep
            let patch = JobPatch::confirmed(job, upgrade.proof_base64, block_height, block_time);
            if let Err(e) = store.update(&job.id, &patch).await {
                tracing::error!(job_id = %job.id, error = %e, "Failed to record confirmation");
                return JobOutcome::Error {
                    error: e.to_string(),
                };
            }

            tracing::info!(
                job_id = %job.id,
                block_height = block_height,
                block_time = %block_time,
                "Anchor confirmed in Bitcoin"
            );

            let mut confirmed = job.clone();
            confirmed.apply(&patch);

            match send_and_record(store, notifier, &confirmed).await {
                Ok(notification) => JobOutcome::Confirmed {
                    block_height,
                    notification,
                },
                Err(e) => JobOutcome::Error {
                    error: e.to_string(),
                },
            }
        }
        OtsStatus::Pending { calendar_urls } => {
            let proof_updated = upgrade.proof_base64.is_some();
            if let Some(proof_base64) = upgrade.proof_base64 {
                let patch = JobPatch::proof_upgraded(proof_base64);
                if let Err(e) = store.update(&job.id, &patch).await {
                    tracing::error!(job_id = %job.id, error = %e, "Failed to store upgraded proof");
                    return JobOutcome::Error {
                        error: e.to_string(),
                    };
                }
            }

            tracing::debug!(
                job_id = %job.id,
                calendars = calendar_urls.len(),
                proof_updated = proof_updated,
                "Anchor still awaiting Bitcoin confirmation"
            );

            JobOutcome::AwaitingConfirmation { proof_updated }
        }
    }
}

/// Notify and, on success, write `notified`/`notifiedAt`
///
/// A failed write after a sent email is an error: the next run will send
/// again.
async fn send_and_record(
    store: &dyn JobStore,
    notifier: &Notifier,
    job: &AnchorJob,
) -> Result<NotifyOutcome, StoreError> {
    let notification = notifier.notify_completion(job).await;

    if notification.is_sent() {
        let patch = JobPatch::notified(job, Utc::now());
        store.update(&job.id, &patch).await.map_err(|e| {
            tracing::error!(job_id = %job.id, error = %e, "Failed to record notification");
            e
        })?;
        tracing::info!(job_id = %job.id, "Notification recorded");
    }

    Ok(notification)
}
