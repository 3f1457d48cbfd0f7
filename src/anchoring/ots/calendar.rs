//! Calendar server communication

use crate::anchoring::error::AnchorError;
use std::time::Duration;

const ACCEPT_OTS: &str = "application/vnd.opentimestamps.v1";
const USER_AGENT: &str = concat!("ots-anchor-worker/", env!("CARGO_PKG_VERSION"));

/// Calendar client for HTTP communication with OTS servers
pub struct CalendarClient {
    /// HTTP client
    client: reqwest::Client,

    /// Timeout
    timeout: Duration,
}

impl CalendarClient {
    /// Create a new calendar client
    pub fn new(timeout_secs: u64) -> Result<Self, AnchorError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| AnchorError::Network(e.to_string()))?;

        Ok(Self {
            client,
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    fn map_send_error(&self, e: reqwest::Error) -> AnchorError {
        if e.is_timeout() {
            AnchorError::Timeout(self.timeout.as_secs())
        } else {
            AnchorError::Network(e.to_string())
        }
    }

    /// Submit a digest to a calendar
    ///
    /// Sends POST `{calendar_url}/digest`; the body of a successful answer is
    /// a serialized timestamp rooted at `digest`.
    pub async fn submit(&self, calendar_url: &str, digest: &[u8]) -> Result<Vec<u8>, AnchorError> {
        tracing::debug!(calendar_url = %calendar_url, "Submitting to calendar");

        let url = format!("{}/digest", calendar_url.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .header(reqwest::header::ACCEPT, ACCEPT_OTS)
            .header(reqwest::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(digest.to_vec())
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        if !response.status().is_success() {
            return Err(AnchorError::ServiceError(format!(
                "Calendar returned status {}",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.map_send_error(e))?
            .to_vec();

        tracing::debug!(calendar_url = %calendar_url, bytes = bytes.len(), "Calendar accepted digest");

        Ok(bytes)
    }

    /// Ask a calendar for the completed timestamp of a pending commitment
    ///
    /// Sends GET `{calendar_url}/timestamp/{hex_commitment}`. A 404 means the
    /// calendar has not committed it to Bitcoin yet.
    pub async fn upgrade(
        &self,
        calendar_url: &str,
        commitment: &[u8],
    ) -> Result<Option<Vec<u8>>, AnchorError> {
        let url = format!(
            "{}/timestamp/{}",
            calendar_url.trim_end_matches('/'),
            hex::encode(commitment)
        );

        tracing::debug!(url = %url, "Fetching timestamp from calendar");

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, ACCEPT_OTS)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        // 404 = timestamp not yet available
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            tracing::debug!(calendar_url = %calendar_url, "Timestamp not yet available at calendar");
            return Ok(None);
        }

        if !response.status().is_success() {
            return Err(AnchorError::ServiceError(format!(
                "Calendar returned status {}",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.map_send_error(e))?
            .to_vec();

        tracing::info!(calendar_url = %calendar_url, "Timestamp upgraded by calendar");

        Ok(Some(bytes))
    }
}
