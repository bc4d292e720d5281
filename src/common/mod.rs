//! Common utilities and types shared across replica-client

pub mod config;
pub mod error;
pub mod types;
pub mod utils;

pub use self::config::Config;
pub use error::{Error, Result};
pub use types::{Command, CommandId, Key, NodeId, Operation, Request, Value};
pub use utils::{quote_body, timestamp_now_nanos};
