//! Test fixtures for calendar and block explorer responses
//!
//! Calendar answers are serialized timestamp bodies (no file header), shaped
//! like what public calendars return.

use atl_core::ots::{Attestation, Op, Serializer, Timestamp, TimestampBuilder};

/// Generate a test hash from arbitrary data
pub fn test_hash(data: &[u8]) -> [u8; 32] {
    use sha2::Digest;
    sha2::Sha256::digest(data).into()
}

fn timestamp_body(timestamp: &Timestamp) -> Vec<u8> {
    let mut body = Vec::new();
    let mut ser = Serializer::new(&mut body);
    if timestamp.serialize(&mut ser).is_err() {
        return Vec::new();
    }
    body
}

/// Calendar `POST /digest` answer: append nonce, sha256, pending(uri)
pub fn mock_calendar_response(digest: &[u8; 32], nonce: &[u8], calendar_url: &str) -> Vec<u8> {
    TimestampBuilder::new(*digest)
        .append(nonce)
        .sha256()
        .add_pending_attestation(calendar_url)
        .build_timestamp()
        .map(|file| timestamp_body(&file.timestamp))
        .unwrap_or_default()
}

/// Calendar `GET /timestamp/<commitment>` answer: sha256 then a Bitcoin attestation
///
/// Only the operation and attestation are encoded, so the bytes parse under
/// any commitment.
pub fn bitcoin_upgrade_response(height: u64) -> Vec<u8> {
    let mut body = Vec::new();
    let mut ser = Serializer::new(&mut body);
    let written = Op::Sha256
        .serialize(&mut ser)
        .and_then(|()| Attestation::Bitcoin { height }.serialize(&mut ser));
    if written.is_err() {
        return Vec::new();
    }
    body
}

/// Block merkle root (display hex) for a message attested directly in the block
pub fn merkle_root_hex(message: &[u8]) -> String {
    let mut reversed = message.to_vec();
    reversed.reverse();
    hex::encode(reversed)
}

/// Merkle root the block must carry for `bitcoin_upgrade_response` to verify
/// when applied to `commitment`
pub fn upgraded_merkle_root(commitment: &[u8]) -> String {
    merkle_root_hex(&Op::Sha256.execute(commitment))
}

/// Esplora `GET /block/<hash>` body
pub fn esplora_block_json(height: u64, merkle_root: &str, time: u64) -> String {
    serde_json::json!({
        "id": format!("{height:064x}"),
        "height": height,
        "merkle_root": merkle_root,
        "timestamp": time,
    })
    .to_string()
}

/// Serve one block from a mock Esplora explorer (height lookup and block body)
#[cfg(test)]
pub(crate) async fn mock_esplora_block(
    server: &mut mockito::ServerGuard,
    height: u64,
    merkle_root: &str,
    time: u64,
) -> Vec<mockito::Mock> {
    let hash = format!("{height:064x}");
    let by_height = server
        .mock("GET", format!("/block-height/{height}").as_str())
        .with_status(200)
        .with_body(&hash)
        .create_async()
        .await;
    let block = server
        .mock("GET", format!("/block/{hash}").as_str())
        .with_status(200)
        .with_body(esplora_block_json(height, merkle_root, time))
        .create_async()
        .await;
    vec![by_height, block]
}
