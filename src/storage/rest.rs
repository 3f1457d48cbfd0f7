//! PostgREST-backed job store
//!
//! Talks to the hosted database through its REST interface using the
//! service role key.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;

use crate::config::{StoreConfig, HTTP_TIMEOUT};
use crate::error::StoreError;
use crate::traits::{AnchorJob, AnchorStatus, ContactDirectory, JobPatch, JobStore};

const ANCHORS_TABLE: &str = "anchors";
const USERS_TABLE: &str = "auth.users";

/// `metadata.notified` missing or anything but `true`
const UNNOTIFIED_FILTER: &str = "(metadata->>notified.is.null,metadata->>notified.neq.true)";

/// Job store over the hosted database's REST API
pub struct RestStore {
    client: reqwest::Client,
    /// `{url}/rest/v1`
    rest_base: String,
}

#[derive(Debug, Deserialize)]
struct UserRow {
    #[serde(default)]
    email: Option<String>,
}

impl RestStore {
    pub fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        let key = HeaderValue::from_str(&config.service_key)
            .map_err(|e| StoreError::Transport(format!("invalid service key: {e}")))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", config.service_key))
            .map_err(|e| StoreError::Transport(format!("invalid service key: {e}")))?;

        let mut headers = HeaderMap::new();
        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .default_headers(headers)
            .build()
            .map_err(StoreError::from_reqwest)?;

        Ok(Self {
            client,
            rest_base: config.rest_base(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.rest_base, table)
    }

    /// Turn a non-success response into `StoreError::Status`
    async fn check(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(StoreError::Status {
            status: status.as_u16(),
            body,
        })
    }

    /// `anchor_status = status`, oldest first, with an optional extra filter
    async fn fetch_anchors(
        &self,
        status: AnchorStatus,
        filter: Option<(&str, &str)>,
        limit: usize,
    ) -> Result<Vec<AnchorJob>, StoreError> {
        let mut query = vec![("anchor_status", format!("eq.{status}"))];
        if let Some((key, value)) = filter {
            query.push((key, value.to_string()));
        }
        query.push(("order", "created_at.asc".to_string()));
        query.push(("limit", limit.to_string()));

        let response = self
            .client
            .get(self.table_url(ANCHORS_TABLE))
            .query(&query)
            .send()
            .await
            .map_err(StoreError::from_reqwest)?;

        let body = Self::check(response)
            .await?
            .text()
            .await
            .map_err(StoreError::from_reqwest)?;
        let jobs: Vec<AnchorJob> = serde_json::from_str(&body)?;

        tracing::debug!(status = %status, count = jobs.len(), "Fetched anchor jobs");

        Ok(jobs)
    }

    async fn fetch_email(&self, user_id: &str) -> Result<Option<String>, StoreError> {
        let response = self
            .client
            .get(self.table_url(USERS_TABLE))
            .query(&[("id", format!("eq.{user_id}"))])
            .send()
            .await
            .map_err(StoreError::from_reqwest)?;

        let rows: Vec<UserRow> = Self::check(response)
            .await?
            .json()
            .await
            .map_err(StoreError::from_reqwest)?;

        Ok(rows.into_iter().next().and_then(|row| row.email))
    }
}

#[async_trait]
impl JobStore for RestStore {
    async fn fetch_by_status(
        &self,
        status: AnchorStatus,
        limit: usize,
    ) -> Result<Vec<AnchorJob>, StoreError> {
        self.fetch_anchors(status, None, limit).await
    }

    async fn fetch_unnotified(
        &self,
        status: AnchorStatus,
        limit: usize,
    ) -> Result<Vec<AnchorJob>, StoreError> {
        self.fetch_anchors(status, Some(("or", UNNOTIFIED_FILTER)), limit)
            .await
    }

    async fn update(&self, id: &str, patch: &JobPatch) -> Result<(), StoreError> {
        let response = self
            .client
            .patch(self.table_url(ANCHORS_TABLE))
            .query(&[("id", format!("eq.{id}"))])
            .header("Prefer", "return=minimal")
            .json(patch)
            .send()
            .await
            .map_err(StoreError::from_reqwest)?;

        Self::check(response).await?;

        tracing::debug!(job_id = %id, "Anchor job updated");

        Ok(())
    }
}

#[async_trait]
impl ContactDirectory for RestStore {
    async fn lookup_email(&self, user_id: &str) -> Option<String> {
        match self.fetch_email(user_id).await {
            Ok(email) => email,
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Could not fetch user email");
                None
            }
        }
    }
}
