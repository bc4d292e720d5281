//! Configuration for replica-client
//!
//! Loaded once from a TOML file with environment overrides, then handed to
//! [`Client::new`](crate::Client::new). Nothing re-reads it afterwards.

use crate::client::encoder::Protocol;
use crate::common::error::{Error, Result};
use crate::common::types::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Environment variables with this prefix override file settings,
/// e.g. `REPLICA_CLIENT_PROTOCOL=envelope`.
pub const ENV_PREFIX: &str = "REPLICA_CLIENT";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// This client's own identity; its site also picks the routing default.
    pub id: NodeId,

    /// Replica base URLs used by the envelope protocol
    #[serde(default)]
    pub addrs: HashMap<NodeId, String>,

    /// Replica base URLs used by the path protocol
    #[serde(default)]
    pub http_addrs: HashMap<NodeId, String>,

    /// Wire format, fixed for the client's lifetime
    #[serde(default)]
    pub protocol: Protocol,

    /// Initial capacity of the completion map
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_buffer_size() -> usize {
    1024
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    pub fn new(id: NodeId, protocol: Protocol) -> Self {
        Self {
            id,
            addrs: HashMap::new(),
            http_addrs: HashMap::new(),
            protocol,
            buffer_size: default_buffer_size(),
            log_level: default_log_level(),
        }
    }

    /// Register a replica's base URL in the table of the selected protocol.
    pub fn with_replica(mut self, id: NodeId, base_url: impl Into<String>) -> Self {
        self.addresses_mut().insert(id, base_url.into());
        self
    }

    /// Load from a TOML file, then apply `REPLICA_CLIENT_*` overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::from(path.as_ref()))
            .add_source(::config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;
        let conf: Config = settings.try_deserialize()?;
        conf.validate()?;
        Ok(conf)
    }

    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::from_str(toml, ::config::FileFormat::Toml))
            .build()?;
        let conf: Config = settings.try_deserialize()?;
        conf.validate()?;
        Ok(conf)
    }

    pub fn validate(&self) -> Result<()> {
        if self.addresses().is_empty() {
            return Err(Error::InvalidConfig(format!(
                "no replica addresses configured for the {} protocol",
                self.protocol
            )));
        }
        if let Some((id, _)) = self.addresses().iter().find(|(_, url)| url.trim().is_empty()) {
            return Err(Error::InvalidConfig(format!("empty address for replica {}", id)));
        }
        Ok(())
    }

    /// Address table used by the selected protocol.
    pub fn addresses(&self) -> &HashMap<NodeId, String> {
        match self.protocol {
            Protocol::Path => &self.http_addrs,
            Protocol::Envelope => &self.addrs,
        }
    }

    fn addresses_mut(&mut self) -> &mut HashMap<NodeId, String> {
        match self.protocol {
            Protocol::Path => &mut self.http_addrs,
            Protocol::Envelope => &mut self.addrs,
        }
    }

    /// Total number of replicas.
    pub fn n(&self) -> usize {
        if self.addrs.is_empty() {
            self.http_addrs.len()
        } else {
            self.addrs.len()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
id = "1.2"
protocol = "envelope"
buffer_size = 64

[addrs]
"1.1" = "http://127.0.0.1:8080"
"2.1" = "http://127.0.0.1:8081"

[http_addrs]
"1.1" = "http://127.0.0.1:9080"
"#;

    #[test]
    fn test_from_toml_str() {
        let conf = Config::from_toml_str(SAMPLE).unwrap();
        assert_eq!(conf.id, NodeId::new(1, 2));
        assert_eq!(conf.protocol, Protocol::Envelope);
        assert_eq!(conf.buffer_size, 64);
        assert_eq!(conf.log_level, "info");
        assert_eq!(conf.n(), 2);
        assert_eq!(
            conf.addresses().get(&NodeId::new(2, 1)).map(String::as_str),
            Some("http://127.0.0.1:8081")
        );
    }

    #[test]
    fn test_defaults_to_path_protocol() {
        let conf = Config::from_toml_str(
            r#"
id = "3.1"
[http_addrs]
"3.1" = "http://localhost:7000"
"#,
        )
        .unwrap();
        assert_eq!(conf.protocol, Protocol::Path);
        assert_eq!(conf.buffer_size, 1024);
        assert_eq!(conf.n(), 1);
    }

    #[test]
    fn test_rejects_missing_table_for_protocol() {
        let err = Config::from_toml_str(
            r#"
id = "1.1"
protocol = "envelope"
[http_addrs]
"1.1" = "http://localhost:7000"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let conf = Config::load(file.path()).unwrap();
        assert_eq!(conf.id, NodeId::new(1, 2));
        assert_eq!(conf.addrs.len(), 2);
    }

    #[test]
    fn test_with_replica_fills_selected_table() {
        let conf = Config::new(NodeId::new(1, 1), Protocol::Envelope)
            .with_replica(NodeId::new(1, 1), "http://a");
        assert_eq!(conf.addrs.len(), 1);
        assert!(conf.http_addrs.is_empty());
        assert!(conf.validate().is_ok());
    }
}
