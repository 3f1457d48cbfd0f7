//! Bitcoin block lookup via public Esplora APIs
//!
//! A Bitcoin attestation only names a block height. Before a job is marked
//! confirmed the attested commitment is checked against that block's merkle
//! root, and the block's own timestamp becomes the confirmation time.
//! Providers are tried in order; there is no fallback estimate.

use crate::anchoring::error::AnchorError;
use atl_core::ots::{extract_bitcoin_attestations, DetachedTimestampFile, OtsError};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

/// Block header fields needed to check an attestation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockHeader {
    pub height: u64,
    pub hash: String,
    /// Merkle root in display (big-endian hex) order
    pub merkle_root: String,
    /// Unix timestamp (seconds) from the block header
    pub time: u64,
}

/// A Bitcoin attestation that matched its block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainConfirmation {
    pub block_height: u64,
    pub block_time: DateTime<Utc>,
}

/// Esplora block explorer client with an in-memory header cache
pub struct BlockExplorer {
    client: reqwest::Client,
    /// Base URLs without trailing slash, tried in order
    providers: Vec<String>,
    cache: RwLock<HashMap<u64, BlockHeader>>,
}

impl BlockExplorer {
    pub fn new(providers: Vec<String>, timeout_secs: u64) -> Result<Self, AnchorError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| AnchorError::Network(e.to_string()))?;

        Ok(Self {
            client,
            providers: providers
                .into_iter()
                .map(|url| url.trim_end_matches('/').to_string())
                .collect(),
            cache: RwLock::new(HashMap::new()),
        })
    }

    pub fn providers(&self) -> &[String] {
        &self.providers
    }

    /// Get the header of the block at `height`
    ///
    /// Returns `BlockFetchFailed` if every provider fails.
    pub async fn block_header(&self, height: u64) -> Result<BlockHeader, AnchorError> {
        let cached = self
            .cache
            .read()
            .ok()
            .and_then(|cache| cache.get(&height).cloned());
        if let Some(header) = cached {
            return Ok(header);
        }

        if self.providers.is_empty() {
            return Err(AnchorError::NotConfigured(
                "no block explorer URLs configured".into(),
            ));
        }

        let mut errors = Vec::new();

        for provider in &self.providers {
            match fetch_from_provider(&self.client, provider, height).await {
                Ok(header) => {
                    if let Ok(mut cache) = self.cache.write() {
                        cache.insert(height, header.clone());
                    }
                    return Ok(header);
                }
                Err(e) => {
                    tracing::warn!(
                        height = height,
                        provider = %provider,
                        error = %e,
                        "Failed to fetch block header, trying next provider"
                    );
                    errors.push(format!("{provider}: {e}"));
                }
            }
        }

        Err(AnchorError::BlockFetchFailed {
            height,
            details: errors.join("; "),
        })
    }
}

/// Two-step Esplora lookup: GET /block-height/{h} -> hash, GET /block/{hash} -> JSON
async fn fetch_from_provider(
    client: &reqwest::Client,
    base_url: &str,
    height: u64,
) -> Result<BlockHeader, String> {
    let hash_url = format!("{base_url}/block-height/{height}");
    let hash = client
        .get(&hash_url)
        .send()
        .await
        .map_err(|e| format!("HTTP error: {e}"))?
        .error_for_status()
        .map_err(|e| format!("HTTP status error: {e}"))?
        .text()
        .await
        .map_err(|e| format!("Read error: {e}"))?;
    let hash = hash.trim().to_string();

    let block_url = format!("{base_url}/block/{hash}");
    let response = client
        .get(&block_url)
        .send()
        .await
        .map_err(|e| format!("HTTP error: {e}"))?
        .error_for_status()
        .map_err(|e| format!("HTTP status error: {e}"))?
        .json::<serde_json::Value>()
        .await
        .map_err(|e| format!("JSON error: {e}"))?;

    let merkle_root = response["merkle_root"]
        .as_str()
        .ok_or_else(|| "Missing 'merkle_root' field in response".to_string())?
        .to_lowercase();
    let time = response["timestamp"]
        .as_u64()
        .ok_or_else(|| "Missing 'timestamp' field in response".to_string())?;

    Ok(BlockHeader {
        height,
        hash,
        merkle_root,
        time,
    })
}

/// Check a proof's Bitcoin attestations against the chain
///
/// Returns `None` while the proof only carries pending attestations. When
/// several Bitcoin attestations exist the lowest verified height wins. A
/// proof whose attestations all disagree with their blocks is `ProofInvalid`.
pub async fn verify_confirmation(
    file: &DetachedTimestampFile,
    explorer: &BlockExplorer,
) -> Result<Option<ChainConfirmation>, AnchorError> {
    let expected_root = <[u8; 32]>::try_from(file.timestamp.start_digest.as_slice())
        .map_err(|_| AnchorError::ProofInvalid("proof digest is not 32 bytes".into()))?;
    let bytes = file.to_bytes()?;

    let mut attestations = match extract_bitcoin_attestations(&bytes, &expected_root) {
        Ok(attestations) => attestations,
        Err(OtsError::PendingOnly { .. }) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    if attestations.is_empty() {
        return Ok(None);
    }
    attestations.sort_by_key(|att| att.block_height);

    let mut mismatched = Vec::new();
    for attestation in &attestations {
        let header = explorer.block_header(attestation.block_height).await?;
        if attestation.verify_against_block(&header.merkle_root) {
            let block_time = i64::try_from(header.time)
                .ok()
                .and_then(|secs| DateTime::from_timestamp(secs, 0))
                .ok_or_else(|| {
                    AnchorError::InvalidResponse(format!(
                        "block {} has out-of-range timestamp {}",
                        header.height, header.time
                    ))
                })?;
            return Ok(Some(ChainConfirmation {
                block_height: attestation.block_height,
                block_time,
            }));
        }

        tracing::warn!(
            height = attestation.block_height,
            block_hash = %header.hash,
            "Bitcoin attestation does not match block merkle root"
        );
        mismatched.push(attestation.block_height.to_string());
    }

    Err(AnchorError::ProofInvalid(format!(
        "Bitcoin attestation does not match merkle root of block(s) {}",
        mismatched.join(", ")
    )))
}
