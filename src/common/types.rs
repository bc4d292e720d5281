//! Data model shared by the encoder, dispatcher and tracker

use crate::common::error::{Error, Result};
use bytes::Bytes;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Opaque payload stored under a key. May be empty.
pub type Value = Bytes;

/// Identity of a replica or a client: `<site>.<node>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    site: u32,
    node: u32,
}

impl NodeId {
    pub const fn new(site: u32, node: u32) -> Self {
        Self { site, node }
    }

    pub fn site(&self) -> u32 {
        self.site
    }

    pub fn node(&self) -> u32 {
        self.node
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.site, self.node)
    }
}

impl FromStr for NodeId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (site, node) = s
            .trim()
            .split_once('.')
            .ok_or_else(|| Error::InvalidId(s.to_string()))?;
        let site = site.parse().map_err(|_| Error::InvalidId(s.to_string()))?;
        let node = node.parse().map_err(|_| Error::InvalidId(s.to_string()))?;
        Ok(Self { site, node })
    }
}

impl Serialize for NodeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for NodeId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Logical addressable unit of the key-value service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Key(pub i64);

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Key {
    fn from(k: i64) -> Self {
        Key(k)
    }
}

impl FromStr for Key {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        s.trim().parse().map(Key)
    }
}

/// Per-client request sequence number. The first issued id is 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandId(pub u64);

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operation {
    Get,
    Put,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Get => write!(f, "GET"),
            Operation::Put => write!(f, "PUT"),
        }
    }
}

/// One read or write. A read never carries a value; a write always does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawCommand", into = "RawCommand")]
pub struct Command {
    kind: Operation,
    key: Key,
    value: Option<Value>,
}

impl Command {
    pub fn get(key: Key) -> Self {
        Self {
            kind: Operation::Get,
            key,
            value: None,
        }
    }

    pub fn put(key: Key, value: Value) -> Self {
        Self {
            kind: Operation::Put,
            key,
            value: Some(value),
        }
    }

    pub fn kind(&self) -> Operation {
        self.kind
    }

    pub fn key(&self) -> Key {
        self.key
    }

    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    pub fn is_read(&self) -> bool {
        self.kind == Operation::Get
    }
}

/// Wire shape of [`Command`]; values travel as base64 text.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawCommand {
    kind: Operation,
    key: Key,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "base64_bytes")]
    value: Option<Value>,
}

impl TryFrom<RawCommand> for Command {
    type Error = String;

    fn try_from(raw: RawCommand) -> std::result::Result<Self, Self::Error> {
        match (raw.kind, raw.value) {
            (Operation::Get, None) => Ok(Command::get(raw.key)),
            (Operation::Get, Some(_)) => Err(format!("GET {} must not carry a value", raw.key)),
            (Operation::Put, Some(value)) => Ok(Command::put(raw.key, value)),
            (Operation::Put, None) => Err(format!("PUT {} requires a value", raw.key)),
        }
    }
}

impl From<Command> for RawCommand {
    fn from(cmd: Command) -> Self {
        Self {
            kind: cmd.kind,
            key: cmd.key,
            value: cmd.value,
        }
    }
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Bytes>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(bytes) => serializer.serialize_str(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Bytes>, D::Error> {
        let encoded: Option<String> = Option::deserialize(deserializer)?;
        encoded
            .map(|s| STANDARD.decode(s).map(Bytes::from))
            .transpose()
            .map_err(serde::de::Error::custom)
    }
}

/// Envelope carried by the envelope protocol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    #[serde(rename = "ClientID")]
    client_id: NodeId,
    #[serde(rename = "CommandID")]
    command_id: CommandId,
    #[serde(rename = "Command")]
    command: Command,
    /// Nanoseconds since the Unix epoch.
    #[serde(rename = "Timestamp")]
    timestamp: i64,
}

impl Request {
    pub fn new(client_id: NodeId, command_id: CommandId, command: Command) -> Self {
        Self {
            client_id,
            command_id,
            command,
            timestamp: crate::common::utils::timestamp_now_nanos(),
        }
    }

    pub fn client_id(&self) -> NodeId {
        self.client_id
    }

    pub fn command_id(&self) -> CommandId {
        self.command_id
    }

    pub fn command(&self) -> &Command {
        &self.command
    }

    /// Nanoseconds since the Unix epoch, taken at construction.
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn into_command(self) -> Command {
        self.command
    }

    /// Equality ignoring the timestamp.
    pub fn same_command(&self, other: &Request) -> bool {
        self.client_id == other.client_id
            && self.command_id == other.command_id
            && self.command == other.command
    }
}
