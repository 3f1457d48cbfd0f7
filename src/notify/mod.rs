//! Completion notifications
//!
//! Looks up the job owner's address and sends the fixed completion email.
//! Recording the `notified` flag is left to the caller.

pub mod resend;
pub mod template;

use std::sync::Arc;

use crate::config::EmailConfig;
use crate::error::NotifyError;
use crate::traits::{AnchorJob, ContactDirectory, Mailer};

pub use resend::ResendMailer;

/// What happened to one notification attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyOutcome {
    /// Email accepted by the provider
    Sent { to: String },
    /// `metadata.notified` already true
    AlreadyNotified,
    /// No user id, or no address on file
    NoRecipient,
    /// Email API key not configured
    Disabled,
    /// Provider or transport failure; retried on a later run
    Failed { error: String },
}

impl NotifyOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, NotifyOutcome::Sent { .. })
    }
}

pub struct Notifier {
    directory: Arc<dyn ContactDirectory>,
    mailer: Option<Arc<dyn Mailer>>,
    sender: String,
}

impl Notifier {
    pub fn new(
        directory: Arc<dyn ContactDirectory>,
        mailer: Option<Arc<dyn Mailer>>,
        sender: impl Into<String>,
    ) -> Self {
        Self {
            directory,
            mailer,
            sender: sender.into(),
        }
    }

    /// Build with a Resend mailer when an API key is configured
    pub fn from_config(
        config: &EmailConfig,
        directory: Arc<dyn ContactDirectory>,
    ) -> Result<Self, NotifyError> {
        let mailer = match &config.api_key {
            Some(key) => {
                Some(Arc::new(ResendMailer::new(&config.api_base, key)?) as Arc<dyn Mailer>)
            }
            None => None,
        };
        Ok(Self::new(directory, mailer, config.sender.clone()))
    }

    pub fn is_enabled(&self) -> bool {
        self.mailer.is_some()
    }

    /// Send the completion email for `job` unless it was already sent
    ///
    /// Never fails; every problem is folded into the outcome and logged.
    pub async fn notify_completion(&self, job: &AnchorJob) -> NotifyOutcome {
        if job.is_notified() {
            return NotifyOutcome::AlreadyNotified;
        }

        let Some(mailer) = &self.mailer else {
            return NotifyOutcome::Disabled;
        };

        let Some(user_id) = job.user_id.as_deref() else {
            tracing::debug!(job_id = %job.id, "Job has no owner, skipping notification");
            return NotifyOutcome::NoRecipient;
        };

        let Some(email) = self.directory.lookup_email(user_id).await else {
            tracing::debug!(job_id = %job.id, user_id = %user_id, "No email on file");
            return NotifyOutcome::NoRecipient;
        };

        let message = template::completion_email(&self.sender, &email, &job.document_hash, &job.id);

        match mailer.send(&message).await {
            Ok(()) => {
                tracing::info!(job_id = %job.id, to = %email, "Completion email sent");
                NotifyOutcome::Sent { to: email }
            }
            Err(e) => {
                tracing::warn!(job_id = %job.id, to = %email, error = %e, "Failed to send completion email");
                NotifyOutcome::Failed {
                    error: e.to_string(),
                }
            }
        }
    }
}
