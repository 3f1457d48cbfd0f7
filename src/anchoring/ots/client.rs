//! OpenTimestamps client implementation

use crate::anchoring::error::AnchorError;
use crate::anchoring::ots::bitcoin::{verify_confirmation, BlockExplorer};
use crate::anchoring::ots::calendar::CalendarClient;
use crate::anchoring::ots::proof::{
    find_pending_attestations, has_bitcoin_attestation, pending_status,
};
use crate::anchoring::ots::types::{OtsConfig, OtsStatus};
use atl_core::ots::{Attestation, DetachedTimestampFile, DigestType, Step, StepData, Timestamp};
use futures::future::join_all;

/// Result of an upgrade attempt
#[derive(Debug, Clone)]
pub struct UpgradeResult {
    /// Proof after applying every calendar answer
    pub file: DetachedTimestampFile,
    /// Whether any calendar contributed new data
    pub changed: bool,
    /// Status after upgrade (Pending or Confirmed)
    pub status: OtsStatus,
}

/// OpenTimestamps client
///
/// Builds proofs locally and only talks HTTP to the calendar servers and,
/// for confirmation, to the block explorers.
pub struct OpenTimestampsClient {
    /// Configuration
    config: OtsConfig,

    /// Calendar client for HTTP communication
    calendar: CalendarClient,

    /// Block lookup for checking Bitcoin attestations
    explorer: BlockExplorer,
}

impl OpenTimestampsClient {
    /// Create a new OTS client with default calendars
    pub fn new() -> Result<Self, AnchorError> {
        Self::with_config(OtsConfig::default())
    }

    /// Create with custom configuration
    pub fn with_config(config: OtsConfig) -> Result<Self, AnchorError> {
        let calendar = CalendarClient::new(config.timeout_secs)?;
        let explorer = BlockExplorer::new(config.explorer_urls.clone(), config.timeout_secs)?;

        Ok(Self {
            config,
            calendar,
            explorer,
        })
    }

    pub fn config(&self) -> &OtsConfig {
        &self.config
    }

    /// Submit a digest to one calendar and parse its timestamp
    async fn submit_to_calendar(
        &self,
        calendar_url: &str,
        digest: &[u8; 32],
    ) -> Result<Timestamp, AnchorError> {
        let response_bytes = self.calendar.submit(calendar_url, digest).await?;

        Timestamp::from_calendar_response(digest.to_vec(), &response_bytes).map_err(|e| {
            AnchorError::InvalidResponse(format!("failed to parse calendar response: {}", e))
        })
    }

    /// Timestamp a digest with every configured calendar
    ///
    /// All calendars are asked concurrently; the answers become branches of
    /// one tree. Fails unless at least `min_quorum` calendars answered.
    pub async fn stamp(&self, digest: &[u8; 32]) -> Result<DetachedTimestampFile, AnchorError> {
        let total = self.config.calendar_urls.len();
        let required = self.config.min_quorum;

        if total == 0 {
            return Err(AnchorError::NotConfigured(
                "no calendar URLs configured".into(),
            ));
        }
        if required == 0 || required > total {
            return Err(AnchorError::NotConfigured(format!(
                "quorum of {required} cannot be met by {total} calendars"
            )));
        }

        let submissions = self.config.calendar_urls.iter().map(|calendar_url| async move {
            let result = self.submit_to_calendar(calendar_url, digest).await;
            (calendar_url, result)
        });
        let answers = join_all(submissions).await;

        let mut branches = Vec::new();
        let mut failures = Vec::new();

        for (calendar_url, result) in answers {
            match result {
                Ok(stamp) => branches.push(stamp.first_step),
                Err(e) => {
                    tracing::warn!(
                        calendar_url = %calendar_url,
                        error = %e,
                        "Calendar submission failed"
                    );
                    failures.push(format!("{calendar_url}: {e}"));
                }
            }
        }

        let received = branches.len();
        if received < required {
            return Err(AnchorError::QuorumNotReached {
                required,
                received,
                details: failures.join("; "),
            });
        }

        tracing::debug!(received, total, "Calendar quorum reached");

        Ok(DetachedTimestampFile {
            digest_type: DigestType::Sha256,
            timestamp: Timestamp {
                start_digest: digest.to_vec(),
                first_step: fork_of(digest.to_vec(), branches),
            },
        })
    }

    /// Upgrade a pending proof by querying every pending calendar
    ///
    /// Calendar failures are logged and skipped so one slow calendar does not
    /// hide an upgrade available from another. A Bitcoin attestation only
    /// counts once its block's merkle root has been checked.
    pub async fn upgrade(&self, file: &DetachedTimestampFile) -> Result<UpgradeResult, AnchorError> {
        let mut upgraded = file.clone();

        if !has_bitcoin_attestation(&file.timestamp) {
            for (calendar_url, commitment) in find_pending_attestations(&file.timestamp) {
                let bytes = match self.calendar.upgrade(&calendar_url, &commitment).await {
                    Ok(Some(bytes)) => bytes,
                    Ok(None) => continue,
                    Err(e) => {
                        tracing::warn!(
                            calendar_url = %calendar_url,
                            error = %e,
                            "Calendar upgrade failed, will retry"
                        );
                        continue;
                    }
                };

                let stamp = match Timestamp::from_calendar_response(commitment.clone(), &bytes) {
                    Ok(stamp) => stamp,
                    Err(e) => {
                        tracing::warn!(
                            calendar_url = %calendar_url,
                            error = %e,
                            "Calendar returned an unparseable upgrade"
                        );
                        continue;
                    }
                };

                replace_pending(
                    &mut upgraded.timestamp.first_step,
                    &calendar_url,
                    &commitment,
                    &stamp.first_step,
                );
            }
        }

        let changed = upgraded != *file;
        let status = match verify_confirmation(&upgraded, &self.explorer).await? {
            Some(confirmation) => OtsStatus::Confirmed {
                block_height: confirmation.block_height,
                block_time: confirmation.block_time,
            },
            None => pending_status(&upgraded.timestamp),
        };

        Ok(UpgradeResult {
            file: upgraded,
            changed,
            status,
        })
    }
}

/// Join calendar answers under one fork, flattening forks at their roots
fn fork_of(digest: Vec<u8>, branches: Vec<Step>) -> Step {
    let mut next = Vec::new();
    for branch in branches {
        match branch.data {
            StepData::Fork => next.extend(branch.next),
            _ => next.push(branch),
        }
    }

    if next.len() == 1 {
        if let Some(only) = next.pop() {
            return only;
        }
    }

    Step {
        data: StepData::Fork,
        output: digest,
        next,
    }
}

/// Swap the pending attestation for `uri` on `commitment` with the calendar's answer
fn replace_pending(step: &mut Step, uri: &str, commitment: &[u8], answer: &Step) -> bool {
    let is_target = matches!(
        &step.data,
        StepData::Attestation(Attestation::Pending { uri: pending }) if pending == uri
    ) && step.output == commitment;

    if is_target {
        *step = answer.clone();
        return true;
    }

    let mut replaced = false;
    for next in &mut step.next {
        replaced |= replace_pending(next, uri, commitment, answer);
    }
    replaced
}
