//! Request encoders for the two wire formats
//!
//! - Path: `GET|PUT <base>/<key>`, client id and command id in the `id` and
//!   `cid` headers, raw value bytes as the body of a write.
//! - Envelope: `POST <base>` with the whole [`Request`] serialized as JSON.
//!
//! Both are pure: they read the identity and the command id handed to them
//! and never touch client state.

use crate::common::{quote_body, Command, CommandId, Error, NodeId, Operation, Request, Result};
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Header carrying the client id in the path protocol.
pub const CLIENT_ID_HEADER: &str = "id";
/// Header carrying the command id in the path protocol.
pub const COMMAND_ID_HEADER: &str = "cid";
/// Content type sent with envelope bodies.
pub const ENVELOPE_CONTENT_TYPE: &str = "application/json";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Path,
    Envelope,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Path => write!(f, "path"),
            Protocol::Envelope => write!(f, "envelope"),
        }
    }
}

/// A request ready for the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl WireRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Header value as text; lookup is case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// HTTP/1.1-style rendering for diagnostics.
    pub fn dump(&self) -> String {
        let mut out = format!("{} {} HTTP/1.1\r\n", self.method, self.url);
        for (name, value) in &self.headers {
            let value = value.to_str().unwrap_or("<opaque>");
            out.push_str(&format!("{}: {}\r\n", name, value));
        }
        out.push_str("\r\n");
        out.push_str(&quote_body(&self.body));
        out
    }
}

pub trait Encoder: Send + Sync + fmt::Debug {
    fn protocol(&self) -> Protocol;

    /// Build the wire request sending `command` to `replica`.
    fn encode(
        &self,
        client_id: NodeId,
        command_id: CommandId,
        replica: NodeId,
        command: &Command,
    ) -> Result<WireRequest>;
}

/// Pick the encoder for `protocol`, giving it the matching address table.
pub fn encoder_for(protocol: Protocol, addrs: HashMap<NodeId, String>) -> Arc<dyn Encoder> {
    match protocol {
        Protocol::Path => Arc::new(PathEncoder::new(addrs)),
        Protocol::Envelope => Arc::new(EnvelopeEncoder::new(addrs)),
    }
}

fn base_url(addrs: &HashMap<NodeId, String>, replica: NodeId) -> Result<&str> {
    addrs
        .get(&replica)
        .map(|url| url.trim_end_matches('/'))
        .ok_or(Error::NoAddress(replica))
}

#[derive(Debug, Clone)]
pub struct PathEncoder {
    addrs: HashMap<NodeId, String>,
}

impl PathEncoder {
    pub fn new(addrs: HashMap<NodeId, String>) -> Self {
        Self { addrs }
    }
}

impl Encoder for PathEncoder {
    fn protocol(&self) -> Protocol {
        Protocol::Path
    }

    fn encode(
        &self,
        client_id: NodeId,
        command_id: CommandId,
        replica: NodeId,
        command: &Command,
    ) -> Result<WireRequest> {
        let url = format!("{}/{}", base_url(&self.addrs, replica)?, command.key());
        let method = match command.kind() {
            Operation::Get => Method::GET,
            Operation::Put => Method::PUT,
        };
        let mut headers = HeaderMap::with_capacity(2);
        headers.insert(
            HeaderName::from_static(CLIENT_ID_HEADER),
            HeaderValue::try_from(client_id.to_string())?,
        );
        headers.insert(HeaderName::from_static(COMMAND_ID_HEADER), HeaderValue::from(command_id.0));
        Ok(WireRequest {
            method,
            url,
            headers,
            body: command.value().cloned().unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct EnvelopeEncoder {
    addrs: HashMap<NodeId, String>,
}

impl EnvelopeEncoder {
    pub fn new(addrs: HashMap<NodeId, String>) -> Self {
        Self { addrs }
    }
}

impl Encoder for EnvelopeEncoder {
    fn protocol(&self) -> Protocol {
        Protocol::Envelope
    }

    fn encode(
        &self,
        client_id: NodeId,
        command_id: CommandId,
        replica: NodeId,
        command: &Command,
    ) -> Result<WireRequest> {
        let url = base_url(&self.addrs, replica)?.to_string();
        let request = Request::new(client_id, command_id, command.clone());
        let body = serde_json::to_vec(&request)?;
        let mut headers = HeaderMap::with_capacity(1);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(ENVELOPE_CONTENT_TYPE));
        Ok(WireRequest {
            method: Method::POST,
            url,
            headers,
            body: Bytes::from(body),
        })
    }
}
