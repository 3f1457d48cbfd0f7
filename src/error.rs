//! Worker error types

use thiserror::Error;

/// Remote store (REST API) errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Request never got a response
    #[error("store request failed: {0}")]
    Transport(String),

    /// Store answered with a non-success status
    #[error("store returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body was not the expected JSON
    #[error("failed to decode store response: {0}")]
    Decode(String),
}

/// Email delivery errors
#[derive(Debug, Error)]
pub enum NotifyError {
    /// Request never got a response
    #[error("email request failed: {0}")]
    Transport(String),

    /// Provider rejected the message
    #[error("email provider returned status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Fatal configuration errors, raised before any work
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Required environment variable missing or empty
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),

    /// Value present but unusable
    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

impl StoreError {
    /// Map a reqwest failure, keeping decode errors apart from transport ones
    pub fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_decode() {
            StoreError::Decode(e.to_string())
        } else {
            StoreError::Transport(e.to_string())
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Decode(e.to_string())
    }
}
