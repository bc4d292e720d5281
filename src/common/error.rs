//! Error types for replica-client

use crate::common::types::NodeId;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // === Encoding Errors ===
    #[error("Failed to encode request: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("No address configured for replica {0}")]
    NoAddress(NodeId),

    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),

    // === Network Errors ===
    #[error("Transport failed for {url}: {reason}")]
    Transport { url: String, reason: String },

    #[error("Unexpected status {status} from {url}")]
    Status { url: String, status: u16 },

    // === Config Errors ===
    #[error("Invalid node id: {0}")]
    InvalidId(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Config error: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("No tokio runtime available to run asynchronous requests")]
    NoRuntime,

    // === Generic ===
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// The round trip never completed.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport { .. })
    }

    /// The round trip completed but the replica did not answer 200 OK.
    pub fn is_protocol(&self) -> bool {
        matches!(self, Error::Status { .. })
    }

    /// The request could not be built at all.
    pub fn is_encoding(&self) -> bool {
        matches!(
            self,
            Error::Encoding(_) | Error::NoAddress(_) | Error::InvalidHeader(_)
        )
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Other(s.to_string())
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Other(s)
    }
}

impl From<anyhow::Error> for Error {
    fn from(e: anyhow::Error) -> Self {
        Error::Other(e.to_string())
    }
}
