//! In-memory job store
//!
//! Behaves like the REST store for a single writer. Used by tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::traits::{AnchorJob, AnchorStatus, ContactDirectory, JobPatch, JobStore};

#[derive(Default)]
pub struct MemoryStore {
    jobs: Mutex<Vec<AnchorJob>>,
    emails: Mutex<HashMap<String, String>>,
    updates: Mutex<Vec<(String, JobPatch)>>,

    /// Whether fetches should fail
    pub fetch_should_fail: AtomicBool,

    /// Whether updates should fail
    pub update_should_fail: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_jobs(jobs: Vec<AnchorJob>) -> Self {
        Self {
            jobs: Mutex::new(jobs),
            ..Self::default()
        }
    }

    pub fn set_email(&self, user_id: &str, email: &str) {
        if let Ok(mut emails) = self.emails.lock() {
            emails.insert(user_id.to_string(), email.to_string());
        }
    }

    /// Current state of a job
    pub fn job(&self, id: &str) -> Option<AnchorJob> {
        self.jobs
            .lock()
            .ok()
            .and_then(|jobs| jobs.iter().find(|j| j.id == id).cloned())
    }

    /// Every patch applied so far, in order
    pub fn updates(&self) -> Vec<(String, JobPatch)> {
        self.updates.lock().map(|u| u.clone()).unwrap_or_default()
    }

    /// Matching jobs, oldest first, at most `limit`
    fn select(
        &self,
        limit: usize,
        predicate: impl Fn(&AnchorJob) -> bool,
    ) -> Result<Vec<AnchorJob>, StoreError> {
        if self.fetch_should_fail.load(Ordering::SeqCst) {
            return Err(StoreError::Transport("mock fetch failure".into()));
        }

        let jobs = self.jobs.lock().map_err(|_| Self::poisoned())?;
        let mut matching: Vec<AnchorJob> = jobs.iter().filter(|j| predicate(j)).cloned().collect();
        matching.sort_by_key(|j| j.created_at);
        matching.truncate(limit);
        Ok(matching)
    }

    fn poisoned() -> StoreError {
        StoreError::Transport("memory store lock poisoned".into())
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn fetch_by_status(
        &self,
        status: AnchorStatus,
        limit: usize,
    ) -> Result<Vec<AnchorJob>, StoreError> {
        self.select(limit, |j| j.anchor_status == status)
    }

    async fn fetch_unnotified(
        &self,
        status: AnchorStatus,
        limit: usize,
    ) -> Result<Vec<AnchorJob>, StoreError> {
        self.select(limit, |j| j.anchor_status == status && !j.is_notified())
    }

    async fn update(&self, id: &str, patch: &JobPatch) -> Result<(), StoreError> {
        if self.update_should_fail.load(Ordering::SeqCst) {
            return Err(StoreError::Status {
                status: 503,
                body: "mock update failure".into(),
            });
        }

        let mut jobs = self.jobs.lock().map_err(|_| Self::poisoned())?;
        if let Some(job) = jobs.iter_mut().find(|j| j.id == id) {
            job.apply(patch);
        }
        drop(jobs);

        self.updates
            .lock()
            .map_err(|_| Self::poisoned())?
            .push((id.to_string(), patch.clone()));
        Ok(())
    }
}

#[async_trait]
impl ContactDirectory for MemoryStore {
    async fn lookup_email(&self, user_id: &str) -> Option<String> {
        self.emails.lock().ok()?.get(user_id).cloned()
    }
}
