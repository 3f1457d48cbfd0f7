//! Anchoring-specific error types

use atl_core::ots::OtsError;
use thiserror::Error;

/// Anchoring operation errors
#[derive(Debug, Clone, Error)]
pub enum AnchorError {
    /// Network communication error
    #[error("network error: {0}")]
    Network(String),

    /// Service returned an error status
    #[error("service error: {0}")]
    ServiceError(String),

    /// Invalid response from service
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Request timeout
    #[error("timeout after {0} seconds")]
    Timeout(u64),

    /// Document hash is not a hex-encoded SHA-256 digest
    #[error("invalid document hash: {0}")]
    InvalidHash(String),

    /// Proof does not commit to the expected document, or disagrees with the chain
    #[error("proof invalid: {0}")]
    ProofInvalid(String),

    /// Stored proof could not be decoded from base64
    #[error("proof encoding error: {0}")]
    ProofEncoding(String),

    /// Malformed OpenTimestamps data
    #[error("proof format error: {0}")]
    Proof(String),

    /// Fewer calendars answered than the configured quorum
    #[error("need at least {required} calendar attestations but received {received}: {details}")]
    QuorumNotReached {
        required: usize,
        received: usize,
        details: String,
    },

    /// Service not configured
    #[error("not configured: {0}")]
    NotConfigured(String),

    /// Failed to fetch the block header from all Bitcoin API providers
    #[error("failed to fetch block header for height {height}: {details}")]
    BlockFetchFailed { height: u64, details: String },
}

impl From<OtsError> for AnchorError {
    fn from(e: OtsError) -> Self {
        AnchorError::Proof(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_error_display() {
        let err = AnchorError::Network("connection refused".to_string());
        assert_eq!(err.to_string(), "network error: connection refused");
    }

    #[test]
    fn test_service_error_display() {
        let err = AnchorError::ServiceError("Calendar returned status 500".to_string());
        assert_eq!(
            err.to_string(),
            "service error: Calendar returned status 500"
        );
    }

    #[test]
    fn test_timeout_display() {
        let err = AnchorError::Timeout(5);
        assert_eq!(err.to_string(), "timeout after 5 seconds");
    }

    #[test]
    fn test_quorum_display() {
        let err = AnchorError::QuorumNotReached {
            required: 2,
            received: 1,
            details: "https://a.example: timeout after 5 seconds".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "need at least 2 calendar attestations but received 1: https://a.example: timeout after 5 seconds"
        );
    }

    #[test]
    fn test_from_ots_error() {
        let err: AnchorError = OtsError::InvalidOperation(0xab).into();
        assert!(matches!(err, AnchorError::Proof(_)));
        assert!(err.to_string().contains("0xab"));
    }

    #[test]
    fn test_block_fetch_failed_display() {
        let err = AnchorError::BlockFetchFailed {
            height: 800_000,
            details: "blockstream.info: HTTP status error".into(),
        };
        assert!(err.to_string().starts_with("failed to fetch block header for height 800000"));
    }
}
