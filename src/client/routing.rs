//! Key → replica routing

use crate::common::{Key, NodeId};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Node number of each site's primary replica; unrouted keys go there.
pub const PRIMARY_NODE: u32 = 1;

/// Read-mostly map from key to the replica that owns it.
///
/// Lookups take the read lock only, so concurrent requests never wait on
/// each other. Updates are rare and hold the write lock for one insert.
#[derive(Debug)]
pub struct RoutingTable {
    index: RwLock<HashMap<Key, NodeId>>,
    default: NodeId,
}

impl RoutingTable {
    /// Table for a client at `site`; misses resolve to `<site>.1`.
    pub fn new(site: u32) -> Self {
        Self {
            index: RwLock::new(HashMap::new()),
            default: NodeId::new(site, PRIMARY_NODE),
        }
    }

    pub fn lookup(&self, key: Key) -> NodeId {
        self.index
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .copied()
            .unwrap_or(self.default)
    }

    /// Route `key` to `replica`, returning the previous owner if any.
    pub fn insert(&self, key: Key, replica: NodeId) -> Option<NodeId> {
        self.index
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, replica)
    }

    pub fn remove(&self, key: Key) -> Option<NodeId> {
        self.index
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&key)
    }

    pub fn default_replica(&self) -> NodeId {
        self.default
    }

    pub fn len(&self) -> usize {
        self.index.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
