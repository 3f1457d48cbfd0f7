//! OpenTimestamps types and configuration

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Calendar aggregators used when none are configured
pub const DEFAULT_CALENDARS: [&str; 4] = [
    "https://a.pool.opentimestamps.org",
    "https://b.pool.opentimestamps.org",
    "https://a.pool.eternitywall.com",
    "https://ots.btc.catallaxy.com",
];

/// Esplora block explorers, tried in order
pub const DEFAULT_EXPLORERS: [&str; 2] = ["https://blockstream.info/api", "https://mempool.space/api"];

/// OTS proof status (derived from attestations)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OtsStatus {
    /// Proof submitted, waiting for Bitcoin confirmation
    Pending { calendar_urls: Vec<String> },

    /// Bitcoin attestation checked against the block's merkle root
    Confirmed {
        block_height: u64,
        /// When the block was mined
        block_time: DateTime<Utc>,
    },
}

/// OpenTimestamps configuration
#[derive(Debug, Clone)]
pub struct OtsConfig {
    /// Calendar server URLs (all are submitted to)
    pub calendar_urls: Vec<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Calendars that must answer for a stamp to count
    pub min_quorum: usize,

    /// Esplora API base URLs used to check Bitcoin attestations
    pub explorer_urls: Vec<String>,
}

impl Default for OtsConfig {
    fn default() -> Self {
        Self {
            calendar_urls: DEFAULT_CALENDARS.iter().map(|s| s.to_string()).collect(),
            timeout_secs: 5,
            min_quorum: 2,
            explorer_urls: DEFAULT_EXPLORERS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl OtsConfig {
    /// Create with custom calendar URLs
    #[must_use]
    pub fn with_calendars(urls: Vec<String>) -> Self {
        Self {
            calendar_urls: urls,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    #[must_use]
    pub fn explorers(mut self, urls: Vec<String>) -> Self {
        self.explorer_urls = urls;
        self
    }
}
