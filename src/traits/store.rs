//! Job store trait definition

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::StoreError;

/// Free-form JSON object attached to every job
pub type Metadata = serde_json::Map<String, Value>;

/// Lifecycle state of an anchor job
///
/// Wire format is the lowercase name stored in `anchor_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnchorStatus {
    /// Waiting to be stamped
    Queued,
    /// Proof stored, Bitcoin attestation not yet observed
    Pending,
    /// Proof carries a Bitcoin block header attestation
    Confirmed,
    /// Stamping failed, see `metadata.stampError`
    Failed,
}

impl AnchorStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnchorStatus::Queued => "queued",
            AnchorStatus::Pending => "pending",
            AnchorStatus::Confirmed => "confirmed",
            AnchorStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for AnchorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A row of the `anchors` table
///
/// Columns the worker does not use are ignored on decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchorJob {
    pub id: String,

    /// Hex SHA-256 of the document
    pub document_hash: String,

    #[serde(default)]
    pub user_id: Option<String>,

    pub anchor_status: AnchorStatus,

    #[serde(default)]
    pub metadata: Option<Metadata>,

    pub created_at: DateTime<Utc>,

    /// Base64 `.ots` detached proof
    #[serde(default)]
    pub raw_proof: Option<String>,
}

impl AnchorJob {
    /// Whether a completion email was already recorded
    pub fn is_notified(&self) -> bool {
        self.metadata
            .as_ref()
            .and_then(|m| m.get(meta::NOTIFIED))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Copy of the metadata object, empty when absent
    pub fn metadata_or_default(&self) -> Metadata {
        self.metadata.clone().unwrap_or_default()
    }

    /// Apply a patch locally, as the store would
    pub fn apply(&mut self, patch: &JobPatch) {
        if let Some(status) = patch.status {
            self.anchor_status = status;
        }
        if let Some(proof) = &patch.raw_proof {
            self.raw_proof = Some(proof.clone());
        }
        if let Some(metadata) = &patch.metadata {
            self.metadata = Some(metadata.clone());
        }
    }
}

/// Metadata keys written by the worker
pub mod meta {
    pub const CALENDARS: &str = "calendars";
    pub const STAMPED_AT: &str = "stampedAt";
    pub const STAMP_ERROR: &str = "stampError";
    pub const FAILED_AT: &str = "failedAt";
    pub const NOTIFIED: &str = "notified";
    pub const NOTIFIED_AT: &str = "notifiedAt";
    pub const BITCOIN_BLOCK_HEIGHT: &str = "bitcoinBlockHeight";
    pub const CONFIRMED_AT: &str = "confirmedAt";
}

/// Partial update of one job; only present fields are sent
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct JobPatch {
    #[serde(rename = "anchor_status", skip_serializing_if = "Option::is_none")]
    pub status: Option<AnchorStatus>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_proof: Option<String>,

    /// Full replacement object: prior keys plus the new ones
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

/// UTC timestamp in RFC 3339 with a `Z` suffix
pub fn timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn merged(job: &AnchorJob, entries: Vec<(&str, Value)>) -> Metadata {
    let mut metadata = job.metadata_or_default();
    for (key, value) in entries {
        metadata.insert(key.to_string(), value);
    }
    metadata
}

impl JobPatch {
    /// `queued -> pending` with the stored proof
    pub fn stamped(
        job: &AnchorJob,
        proof_base64: String,
        calendars: &[String],
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            status: Some(AnchorStatus::Pending),
            raw_proof: Some(proof_base64),
            metadata: Some(merged(
                job,
                vec![
                    (meta::CALENDARS, Value::from(calendars.to_vec())),
                    (meta::STAMPED_AT, Value::from(timestamp(now))),
                ],
            )),
        }
    }

    /// `queued -> failed` with the error text
    pub fn stamp_failed(job: &AnchorJob, error: &str, now: DateTime<Utc>) -> Self {
        Self {
            status: Some(AnchorStatus::Failed),
            raw_proof: None,
            metadata: Some(merged(
                job,
                vec![
                    (meta::STAMP_ERROR, Value::from(error)),
                    (meta::FAILED_AT, Value::from(timestamp(now))),
                ],
            )),
        }
    }

    /// Record a sent completion email; status untouched
    pub fn notified(job: &AnchorJob, now: DateTime<Utc>) -> Self {
        Self {
            status: None,
            raw_proof: None,
            metadata: Some(merged(
                job,
                vec![
                    (meta::NOTIFIED, Value::Bool(true)),
                    (meta::NOTIFIED_AT, Value::from(timestamp(now))),
                ],
            )),
        }
    }

    /// `pending -> confirmed` with the upgraded proof
    ///
    /// `confirmedAt` is the time of the attesting block, not the time of
    /// this run.
    pub fn confirmed(
        job: &AnchorJob,
        proof_base64: Option<String>,
        block_height: u64,
        block_time: DateTime<Utc>,
    ) -> Self {
        Self {
            status: Some(AnchorStatus::Confirmed),
            raw_proof: proof_base64,
            metadata: Some(merged(
                job,
                vec![
                    (meta::BITCOIN_BLOCK_HEIGHT, Value::from(block_height)),
                    (meta::CONFIRMED_AT, Value::from(timestamp(block_time))),
                ],
            )),
        }
    }

    /// Store an upgraded proof that is still pending
    pub fn proof_upgraded(proof_base64: String) -> Self {
        Self {
            raw_proof: Some(proof_base64),
            ..Self::default()
        }
    }
}

/// Access to the `anchors` table
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Jobs in `status`, oldest `created_at` first, at most `limit`
    async fn fetch_by_status(
        &self,
        status: AnchorStatus,
        limit: usize,
    ) -> Result<Vec<AnchorJob>, StoreError>;

    /// Like `fetch_by_status`, skipping jobs whose `metadata.notified` is true
    async fn fetch_unnotified(
        &self,
        status: AnchorStatus,
        limit: usize,
    ) -> Result<Vec<AnchorJob>, StoreError>;

    /// Patch one job by primary key (last write wins)
    async fn update(&self, id: &str, patch: &JobPatch) -> Result<(), StoreError>;
}

/// Resolves job owners to email addresses
#[async_trait]
pub trait ContactDirectory: Send + Sync {
    /// Email of `user_id`; lookup failures resolve to `None`
    async fn lookup_email(&self, user_id: &str) -> Option<String>;
}
