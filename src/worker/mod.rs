//! Anchor worker
//!
//! Run-to-completion batch driver with two phases:
//! 1. Stamp: queued jobs are timestamped and moved to pending (or failed)
//! 2. Follow-up: pending jobs are (optionally confirmed and) notified

pub mod followup;
pub mod outcome;
pub mod stamp;

use std::sync::Arc;

use crate::anchoring::ots::ProofStamper;
use crate::config::RunConfig;
use crate::notify::Notifier;
use crate::traits::JobStore;

pub use outcome::{JobOutcome, JobReport, Phase, PhaseReport, RunSummary};

pub struct AnchorWorker {
    store: Arc<dyn JobStore>,
    stamper: Arc<dyn ProofStamper>,
    notifier: Notifier,
    config: RunConfig,
}

impl AnchorWorker {
    pub fn new(
        store: Arc<dyn JobStore>,
        stamper: Arc<dyn ProofStamper>,
        notifier: Notifier,
        config: RunConfig,
    ) -> Self {
        Self {
            store,
            stamper,
            notifier,
            config,
        }
    }

    /// Get configuration reference
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Run the phases selected by the run mode once
    ///
    /// Per-job failures end up in the summary; nothing here is fatal.
    pub async fn run(&self) -> RunSummary {
        let mut summary = RunSummary::default();

        if self.config.mode.stamps() {
            summary.stamp = Some(
                stamp::stamp_queued_jobs(
                    self.store.as_ref(),
                    self.stamper.as_ref(),
                    self.config.limit,
                )
                .await,
            );
        }

        if self.config.mode.follows_up() {
            if self.config.mode.stamps() && !self.config.phase_pause.is_zero() {
                tracing::debug!(
                    pause_ms = self.config.phase_pause.as_millis() as u64,
                    "Pausing before follow-up"
                );
                tokio::time::sleep(self.config.phase_pause).await;
            }

            summary.followup = Some(
                followup::follow_up_pending_jobs(
                    self.store.as_ref(),
                    self.stamper.as_ref(),
                    &self.notifier,
                    self.config.limit,
                    self.config.require_confirmation,
                )
                .await,
            );
        }

        summary.log();
        summary
    }
}
