//! Request/response transport
//!
//! The dispatcher only needs "send this, give me status and body". Anything
//! that can do that, a real HTTP client or an in-memory stub, implements
//! [`Transport`].

use crate::client::encoder::WireRequest;
use crate::common::{quote_body, Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;

/// What came back from one round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

impl WireResponse {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self::new(StatusCode::OK, body)
    }

    pub fn dump(&self) -> String {
        format!("HTTP/1.1 {}\r\n\r\n{}", self.status, quote_body(&self.body))
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform exactly one round trip. `Err` means it did not complete;
    /// any status, including errors, is a completed round trip.
    async fn round_trip(&self, request: &WireRequest) -> Result<WireResponse>;
}

/// HTTP transport backed by `reqwest`. No timeout is set: a stuck replica
/// holds the calling task until the connection itself fails.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn round_trip(&self, request: &WireRequest) -> Result<WireResponse> {
        let transport_err = |e: reqwest::Error| Error::Transport {
            url: request.url.clone(),
            reason: e.to_string(),
        };

        let resp = self
            .client
            .request(request.method.clone(), &request.url)
            .headers(request.headers.clone())
            .body(request.body.clone())
            .send()
            .await
            .map_err(transport_err)?;
        let status = resp.status();
        let body = resp.bytes().await.map_err(transport_err)?;
        Ok(WireResponse { status, body })
    }
}
