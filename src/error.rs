//! Error types for calls to the external search, news and sentiment services

use thiserror::Error;

/// A collaborator call failed or returned data that could not be decoded.
///
/// Zero results is not an error and is never reported through this type.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {0}")]
    Status(u16),

    #[error("unparseable response: {0}")]
    Decode(String),
}

impl TransportError {
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }
}
