//! Resend transactional email client

use async_trait::async_trait;

use crate::config::HTTP_TIMEOUT;
use crate::error::NotifyError;
use crate::traits::{EmailMessage, Mailer};

/// Sends email through `POST {api_base}/emails`
pub struct ResendMailer {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
}

impl ResendMailer {
    pub fn new(api_base: &str, api_key: &str) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(format!("{}/emails", self.api_base))
            .bearer_auth(&self.api_key)
            .json(message)
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}
