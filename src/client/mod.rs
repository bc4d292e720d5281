//! Client for the replicated key-value service
//!
//! A request flows through the pieces in this module in order:
//! - [`RoutingTable`] picks the replica for the key
//! - an [`Encoder`] builds the wire request for the configured protocol
//! - the [`Dispatcher`] runs it through the [`Transport`]
//! - for asynchronous calls, the [`CompletionTracker`] records the outcome

pub mod dispatcher;
pub mod encoder;
pub mod routing;
pub mod tracker;
pub mod transport;

pub use dispatcher::Dispatcher;
pub use encoder::{encoder_for, Encoder, EnvelopeEncoder, PathEncoder, Protocol, WireRequest};
pub use routing::{RoutingTable, PRIMARY_NODE};
pub use tracker::{Completion, CompletionTracker, Outcome, Snapshot};
pub use transport::{HttpTransport, Transport, WireResponse};

use crate::common::{Command, CommandId, Config, Error, Key, NodeId, Result, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;

/// State shared between the client and the tasks it spawns.
#[derive(Debug)]
struct Inner {
    id: NodeId,
    routing: RoutingTable,
    encoder: Arc<dyn Encoder>,
    dispatcher: Dispatcher,
}

impl Inner {
    fn encode(&self, command_id: CommandId, command: &Command) -> Result<WireRequest> {
        let replica = self.routing.lookup(command.key());
        self.encoder
            .encode(self.id, command_id, replica, command)
            .inspect_err(|e| {
                tracing::error!("{} {} (command {}): {}", command.kind(), command.key(), command_id, e)
            })
    }

    async fn read(&self, command_id: CommandId, key: Key) -> Result<Value> {
        let request = self.encode(command_id, &Command::get(key))?;
        self.dispatcher.execute_read(&request).await
    }

    async fn write(&self, command_id: CommandId, key: Key, value: Value) -> Result<()> {
        let request = self.encode(command_id, &Command::put(key, value))?;
        self.dispatcher.execute_write(&request).await
    }
}

/// Main access point of the client library.
///
/// Every call, synchronous or not, consumes the next command id. Each call
/// makes exactly one attempt; failures are never retried.
pub struct Client {
    inner: Arc<Inner>,
    n: usize,
    last_cid: AtomicU64,
    tracker: CompletionTracker,
    runtime: Handle,
}

impl Client {
    /// Build a client from `config`. Must be called from within a tokio
    /// runtime; asynchronous requests are spawned onto it.
    pub fn new(config: &Config, transport: Arc<dyn Transport>) -> Result<Self> {
        config.validate()?;
        let runtime = Handle::try_current().map_err(|_| Error::NoRuntime)?;

        let inner = Inner {
            id: config.id,
            routing: RoutingTable::new(config.id.site()),
            encoder: encoder_for(config.protocol, config.addresses().clone()),
            dispatcher: Dispatcher::new(transport),
        };
        let tracker = CompletionTracker::spawn(&runtime, config.buffer_size);

        tracing::info!(
            "client {} ready: {} protocol, {} replicas",
            config.id,
            config.protocol,
            config.n()
        );

        Ok(Self {
            inner: Arc::new(inner),
            n: config.n(),
            last_cid: AtomicU64::new(0),
            tracker,
            runtime,
        })
    }

    pub fn id(&self) -> NodeId {
        self.inner.id
    }

    /// Total number of replicas known from configuration.
    pub fn replicas(&self) -> usize {
        self.n
    }

    pub fn protocol(&self) -> Protocol {
        self.inner.encoder.protocol()
    }

    pub fn routing(&self) -> &RoutingTable {
        &self.inner.routing
    }

    /// The most recently issued command id, 0 before the first request.
    pub fn last_command_id(&self) -> CommandId {
        CommandId(self.last_cid.load(Ordering::SeqCst))
    }

    fn next_command_id(&self) -> CommandId {
        CommandId(self.last_cid.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Read `key`, waiting for the round trip. Any failure means no value.
    pub async fn get(&self, key: Key) -> Result<Value> {
        let cid = self.next_command_id();
        self.inner.read(cid, key).await
    }

    /// Write `value` under `key`, waiting for the acknowledgement.
    pub async fn put(&self, key: Key, value: impl Into<Value>) -> Result<()> {
        let cid = self.next_command_id();
        self.inner.write(cid, key, value.into()).await
    }

    /// Issue a read in the background. The value is discarded; the outcome
    /// is visible only through the completion tracker under the returned id.
    pub fn get_async(&self, key: Key) -> CommandId {
        let cid = self.next_command_id();
        self.tracker.begin(cid);

        let inner = self.inner.clone();
        let completion = self.tracker.completion(cid);
        self.runtime.spawn(async move {
            let ok = inner.read(cid, key).await.is_ok();
            completion.finish(ok);
        });
        cid
    }

    /// Issue a write in the background; see [`Client::get_async`].
    pub fn put_async(&self, key: Key, value: impl Into<Value>) -> CommandId {
        let cid = self.next_command_id();
        self.tracker.begin(cid);

        let inner = self.inner.clone();
        let completion = self.tracker.completion(cid);
        let value = value.into();
        self.runtime.spawn(async move {
            let ok = inner.write(cid, key, value).await.is_ok();
            completion.finish(ok);
        });
        cid
    }

    /// Number of asynchronous requests that have succeeded so far. Call
    /// [`Client::wait`] first for a final count.
    pub fn done_count(&self) -> usize {
        self.tracker.done_count()
    }

    pub fn outstanding(&self) -> usize {
        self.tracker.outstanding()
    }

    /// Wait until every asynchronous request issued so far has completed.
    pub async fn wait(&self) {
        self.tracker.wait().await
    }

    pub async fn outcome(&self, id: CommandId) -> Option<Outcome> {
        self.tracker.outcome(id).await
    }

    pub fn tracker(&self) -> &CompletionTracker {
        &self.tracker
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("id", &self.inner.id)
            .field("protocol", &self.protocol())
            .field("replicas", &self.n)
            .field("last_command_id", &self.last_command_id())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_requires_runtime() {
        let config = Config::new(NodeId::new(1, 1), Protocol::Path)
            .with_replica(NodeId::new(1, 1), "http://127.0.0.1:1");
        let err = Client::new(&config, Arc::new(HttpTransport::new())).unwrap_err();
        assert!(matches!(err, Error::NoRuntime));
    }

    #[tokio::test]
    async fn test_new_rejects_empty_table() {
        let config = Config::new(NodeId::new(1, 1), Protocol::Envelope);
        let err = Client::new(&config, Arc::new(HttpTransport::new())).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn test_unroutable_replica_fails_without_round_trip() {
        let config = Config::new(NodeId::new(1, 1), Protocol::Path)
            .with_replica(NodeId::new(1, 1), "http://127.0.0.1:1");
        let client = Client::new(&config, Arc::new(HttpTransport::new())).unwrap();
        client.routing().insert(Key(5), NodeId::new(7, 7));

        let err = client.get(Key(5)).await.unwrap_err();
        assert!(matches!(err, Error::NoAddress(id) if id == NodeId::new(7, 7)));

        let cid = client.put_async(Key(5), "v");
        client.wait().await;
        assert_eq!(client.outcome(cid).await, Some(Outcome::Failed));
        assert_eq!(client.done_count(), 0);
    }
}
