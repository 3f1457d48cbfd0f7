//! Email delivery trait definition

use async_trait::async_trait;
use serde::Serialize;

use crate::error::NotifyError;

/// One outgoing email, in the shape the provider API expects
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
}

/// Transactional email provider
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotifyError>;
}
