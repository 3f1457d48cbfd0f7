//! Test fixtures and worker setup utilities

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use mockito::{Mock, Server, ServerGuard};
use std::sync::{Arc, Mutex};

use ots_anchor_worker::anchoring::ots::fixtures::{esplora_block_json, mock_calendar_response};
use ots_anchor_worker::anchoring::ots::{OpenTimestampsClient, OtsConfig, ProofStamper};
use ots_anchor_worker::error::NotifyError;
use ots_anchor_worker::notify::Notifier;
use ots_anchor_worker::storage::MemoryStore;
use ots_anchor_worker::traits::{EmailMessage, Mailer};
use ots_anchor_worker::{AnchorJob, AnchorStatus, AnchorWorker, RunConfig, RunMode};

pub const OWNER_ID: &str = "user-1";
pub const OWNER_EMAIL: &str = "owner@example.com";

/// Mailer that keeps every message it was asked to send
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<EmailMessage>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

/// Queued job owned by `OWNER_ID`, created `minutes` after a fixed epoch
pub fn queued_job(id: &str, document_hash: &str, minutes: i64) -> AnchorJob {
    AnchorJob {
        id: id.to_string(),
        document_hash: document_hash.to_string(),
        user_id: Some(OWNER_ID.to_string()),
        anchor_status: AnchorStatus::Queued,
        metadata: None,
        created_at: Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap() + Duration::minutes(minutes),
        raw_proof: None,
    }
}

/// In-memory store, recording mailer, and any stamper
pub struct Pipeline {
    pub store: Arc<MemoryStore>,
    pub mailer: Arc<RecordingMailer>,
    pub stamper: Arc<dyn ProofStamper>,
}

impl Pipeline {
    pub fn new(stamper: Arc<dyn ProofStamper>, jobs: Vec<AnchorJob>) -> Self {
        let store = Arc::new(MemoryStore::with_jobs(jobs));
        store.set_email(OWNER_ID, OWNER_EMAIL);
        Self {
            store,
            mailer: Arc::new(RecordingMailer::default()),
            stamper,
        }
    }

    pub fn worker(&self, mode: RunMode) -> AnchorWorker {
        self.worker_with(RunConfig {
            mode,
            phase_pause: std::time::Duration::ZERO,
            ..RunConfig::default()
        })
    }

    pub fn worker_with(&self, config: RunConfig) -> AnchorWorker {
        let notifier = Notifier::new(
            self.store.clone(),
            Some(self.mailer.clone() as Arc<dyn Mailer>),
            "EcoSign <onboarding@resend.dev>",
        );
        AnchorWorker::new(self.store.clone(), self.stamper.clone(), notifier, config)
    }
}

/// Mock calendar answering `POST /digest` for `digest` with a pending attestation
pub async fn pending_calendar(digest: &[u8; 32], nonce: u8) -> (ServerGuard, Mock) {
    let mut server = Server::new_async().await;
    let url = server.url();
    let mock = server
        .mock("POST", "/digest")
        .with_status(200)
        .with_body(mock_calendar_response(digest, &[nonce], &url))
        .create_async()
        .await;
    (server, mock)
}

/// Mock calendar that is down
pub async fn failing_calendar() -> (ServerGuard, Mock) {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/digest")
        .with_status(503)
        .create_async()
        .await;
    (server, mock)
}

/// Real client pointed at the given calendars
pub fn calendar_client(servers: &[&ServerGuard]) -> Arc<OpenTimestampsClient> {
    let urls = servers.iter().map(|s| s.url()).collect();
    Arc::new(OpenTimestampsClient::with_config(OtsConfig::with_calendars(urls).timeout_secs(2)).unwrap())
}

/// Real client pointed at the given calendars and one block explorer
pub fn calendar_client_with_explorer(
    servers: &[&ServerGuard],
    explorer: &ServerGuard,
) -> Arc<OpenTimestampsClient> {
    let urls = servers.iter().map(|s| s.url()).collect();
    let config = OtsConfig::with_calendars(urls)
        .timeout_secs(2)
        .explorers(vec![explorer.url()]);
    Arc::new(OpenTimestampsClient::with_config(config).unwrap())
}

/// Mock Esplora explorer serving a single block
pub async fn explorer_with_block(height: u64, merkle_root: &str, time: u64) -> ServerGuard {
    let mut server = Server::new_async().await;
    let hash = format!("{height:064x}");
    server
        .mock("GET", format!("/block-height/{height}").as_str())
        .with_status(200)
        .with_body(&hash)
        .create_async()
        .await;
    server
        .mock("GET", format!("/block/{hash}").as_str())
        .with_status(200)
        .with_body(esplora_block_json(height, merkle_root, time))
        .create_async()
        .await;
    server
}
