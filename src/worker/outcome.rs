//! Per-job outcomes and run summaries

use crate::notify::NotifyOutcome;

/// Result of processing one job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// Proof stored, job now pending
    Stamped,
    /// Stamping failed, job now failed
    StampFailed { error: String },
    /// Follow-up handled the notification
    Notification(NotifyOutcome),
    /// Bitcoin attestation observed, job now confirmed
    Confirmed {
        block_height: u64,
        notification: NotifyOutcome,
    },
    /// No Bitcoin attestation yet; `proof_updated` if a calendar added data
    AwaitingConfirmation { proof_updated: bool },
    /// The job could not be processed (store write, proof decode)
    Error { error: String },
}

impl JobOutcome {
    pub fn is_error(&self) -> bool {
        matches!(self, JobOutcome::Error { .. })
    }

    /// Whether a completion email went out for this job
    pub fn notified(&self) -> bool {
        match self {
            JobOutcome::Notification(n) => n.is_sent(),
            JobOutcome::Confirmed { notification, .. } => notification.is_sent(),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReport {
    pub job_id: String,
    pub outcome: JobOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Stamp,
    Followup,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Stamp => write!(f, "stamp"),
            Phase::Followup => write!(f, "followup"),
        }
    }
}

/// Everything one phase did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseReport {
    pub phase: Phase,
    /// Set when fetching jobs failed and the phase was aborted
    pub fetch_error: Option<String>,
    pub jobs: Vec<JobReport>,
}

impl PhaseReport {
    pub fn new(phase: Phase) -> Self {
        Self {
            phase,
            fetch_error: None,
            jobs: Vec::new(),
        }
    }

    pub fn aborted(phase: Phase, error: String) -> Self {
        Self {
            fetch_error: Some(error),
            ..Self::new(phase)
        }
    }

    pub fn push(&mut self, job_id: &str, outcome: JobOutcome) {
        self.jobs.push(JobReport {
            job_id: job_id.to_string(),
            outcome,
        });
    }

    pub fn count(&self, predicate: impl Fn(&JobOutcome) -> bool) -> usize {
        self.jobs.iter().filter(|r| predicate(&r.outcome)).count()
    }

    pub fn log(&self) {
        if let Some(error) = &self.fetch_error {
            tracing::error!(phase = %self.phase, error = %error, "Phase aborted");
            return;
        }

        match self.phase {
            Phase::Stamp => tracing::info!(
                phase = %self.phase,
                processed = self.jobs.len(),
                stamped = self.count(|o| matches!(o, JobOutcome::Stamped)),
                failed = self.count(|o| matches!(o, JobOutcome::StampFailed { .. })),
                errors = self.count(JobOutcome::is_error),
                "Phase completed"
            ),
            Phase::Followup => tracing::info!(
                phase = %self.phase,
                processed = self.jobs.len(),
                notified = self.count(JobOutcome::notified),
                confirmed = self.count(|o| matches!(o, JobOutcome::Confirmed { .. })),
                errors = self.count(JobOutcome::is_error),
                "Phase completed"
            ),
        }
    }
}

/// Result of one worker run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub stamp: Option<PhaseReport>,
    pub followup: Option<PhaseReport>,
}

impl RunSummary {
    pub fn phases(&self) -> impl Iterator<Item = &PhaseReport> {
        self.stamp.iter().chain(self.followup.iter())
    }

    /// Find the last report for a job across phases
    pub fn outcome_of(&self, job_id: &str) -> Option<&JobOutcome> {
        self.phases()
            .flat_map(|p| p.jobs.iter())
            .filter(|r| r.job_id == job_id)
            .map(|r| &r.outcome)
            .last()
    }

    pub fn emails_sent(&self) -> usize {
        self.phases().map(|p| p.count(JobOutcome::notified)).sum()
    }

    pub fn log(&self) {
        for phase in self.phases() {
            phase.log();
        }
        tracing::info!(emails_sent = self.emails_sent(), "Run finished");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notified_detection() {
        assert!(JobOutcome::Notification(NotifyOutcome::Sent { to: "a@b".into() }).notified());
        assert!(!JobOutcome::Notification(NotifyOutcome::Disabled).notified());
        assert!(JobOutcome::Confirmed {
            block_height: 1,
            notification: NotifyOutcome::Sent { to: "a@b".into() },
        }
        .notified());
        assert!(!JobOutcome::Stamped.notified());
    }

    #[test]
    fn test_summary_counts() {
        let mut stamp = PhaseReport::new(Phase::Stamp);
        stamp.push("A1", JobOutcome::Stamped);
        stamp.push("A2", JobOutcome::StampFailed { error: "x".into() });

        let mut followup = PhaseReport::new(Phase::Followup);
        followup.push(
            "A1",
            JobOutcome::Notification(NotifyOutcome::Sent { to: "a@b".into() }),
        );

        let summary = RunSummary {
            stamp: Some(stamp),
            followup: Some(followup),
        };

        assert_eq!(summary.emails_sent(), 1);
        assert!(summary.outcome_of("A1").unwrap().notified());
        assert_eq!(
            summary.outcome_of("A2"),
            Some(&JobOutcome::StampFailed { error: "x".into() })
        );
        assert!(summary.outcome_of("A3").is_none());
    }

    #[test]
    fn test_aborted_phase() {
        let report = PhaseReport::aborted(Phase::Followup, "store down".into());
        assert_eq!(report.fetch_error.as_deref(), Some("store down"));
        assert!(report.jobs.is_empty());
        assert_eq!(Phase::Followup.to_string(), "followup");
    }
}
