//! # replica-client
//!
//! Client library for a replicated key-value service:
//! - Routes each key to the replica that owns it, falling back to the
//!   primary of the client's own site
//! - Speaks either of two wire formats, chosen once per client
//! - Synchronous Get/Put and fire-and-query asynchronous Get/Put
//! - Tracks how many asynchronous requests are outstanding and which succeeded
//!
//! Each operation makes exactly one attempt. There is no retry, backoff or
//! timeout; the client exists to measure raw latency and throughput.
//!
//! ## Architecture
//!
//! ```text
//!  caller ── Client ── command id (atomic)
//!              │
//!              ├─ RoutingTable::lookup(key) ─────────> replica id
//!              ├─ Encoder::encode(...) ──────────────> WireRequest
//!              │     PathEncoder     GET|PUT <base>/<key>, id/cid headers
//!              │     EnvelopeEncoder POST <base>, JSON Request
//!              ├─ Dispatcher::execute_*(...) ─ Transport::round_trip
//!              │
//!              └─ *_async: tokio task ──> CompletionTracker (aggregator)
//! ```
//!
//! ## Usage
//!
//! ```no_run
//! use replica_client::{Client, Config, HttpTransport, Key};
//! use std::sync::Arc;
//!
//! # async fn run() -> replica_client::Result<()> {
//! let config = Config::load("client.toml")?;
//! let client = Client::new(&config, Arc::new(HttpTransport::new()))?;
//!
//! client.put(Key(1), "hello").await?;
//! let value = client.get(Key(1)).await?;
//! assert_eq!(value.as_ref(), b"hello");
//!
//! for k in 0..100 {
//!     client.put_async(Key(k), "v");
//! }
//! client.wait().await;
//! println!("{} succeeded", client.done_count());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod common;

// Re-export commonly used types
pub use client::{Client, HttpTransport, Outcome, Protocol, Transport, WireRequest, WireResponse};
pub use common::{Command, CommandId, Config, Error, Key, NodeId, Operation, Request, Result, Value};

/// Current version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
