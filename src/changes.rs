use crate::media::MediaItem;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::trace;

const DEFAULT_CAPACITY: usize = 64;

/// What happened to a node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChangeFlags {
    pub new: bool,
    pub parent_changed: bool,
    pub removed: bool,
    pub metadata_changed: bool,
}

impl ChangeFlags {
    pub const NEW: Self = Self {
        new: true,
        parent_changed: false,
        removed: false,
        metadata_changed: false,
    };

    pub const PARENT_CHANGED: Self = Self {
        new: false,
        parent_changed: true,
        removed: false,
        metadata_changed: false,
    };

    pub const REMOVED: Self = Self {
        new: false,
        parent_changed: false,
        removed: true,
        metadata_changed: false,
    };

    pub const METADATA_CHANGED: Self = Self {
        new: false,
        parent_changed: false,
        removed: false,
        metadata_changed: true,
    };

    pub fn union(self, other: Self) -> Self {
        Self {
            new: self.new || other.new,
            parent_changed: self.parent_changed || other.parent_changed,
            removed: self.removed || other.removed,
            metadata_changed: self.metadata_changed || other.metadata_changed,
        }
    }

    /// Changes that may bring a node into a list.
    pub fn is_arrival(&self) -> bool {
        self.new || self.parent_changed
    }
}

/// A node as it is after the change, together with what changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeChange {
    pub node: MediaItem,
    pub flags: ChangeFlags,
}

impl NodeChange {
    pub fn new(node: MediaItem, flags: ChangeFlags) -> Self {
        Self { node, flags }
    }
}

/// Batches are shared between every subscriber.
pub type ChangeBatch = Arc<Vec<NodeChange>>;

/// Fan-out of node change batches to every live list.
#[derive(Clone)]
pub struct NodeChangeBus {
    sender: broadcast::Sender<ChangeBatch>,
}

impl Default for NodeChangeBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl NodeChangeBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _rx) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeBatch> {
        self.sender.subscribe()
    }

    /// Publish a batch, returning how many subscribers will see it.
    pub fn publish(&self, changes: Vec<NodeChange>) -> usize {
        if changes.is_empty() {
            return 0;
        }

        let count = changes.len();
        match self.sender.send(Arc::new(changes)) {
            Ok(receivers) => {
                trace!("Published {} node changes to {} receivers", count, receivers);
                receivers
            }
            Err(_) => 0,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
