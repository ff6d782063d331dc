pub mod error;
pub mod memory;

pub use error::RepositoryError;
pub use memory::{MemoryRepository, NodeListing, NodeRecord};

use crate::media::{Handle, MediaItem};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;

/// Read access to the remote node tree.
#[async_trait]
pub trait NodeRepository: Send + Sync {
    /// Children of `container`, ordered by `sort`.
    async fn list_children(
        &self,
        container: Handle,
        sort: SortOrder,
    ) -> Result<Vec<MediaItem>, RepositoryError>;

    async fn get_node(&self, handle: Handle) -> Result<Option<MediaItem>, RepositoryError>;

    /// Resolve a public file link to its node.
    async fn get_public_node(&self, link: &str) -> Result<Option<MediaItem>, RepositoryError>;
}

pub type DynNodeRepository = Arc<dyn NodeRepository>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    ModificationDesc,
    ModificationAsc,
    NameAsc,
    NameDesc,
}

impl SortOrder {
    pub fn compare(self, a: &MediaItem, b: &MediaItem) -> Ordering {
        let by_name = || a.name.to_lowercase().cmp(&b.name.to_lowercase());
        match self {
            SortOrder::ModificationDesc => b.modified.cmp(&a.modified).then_with(by_name),
            SortOrder::ModificationAsc => a.modified.cmp(&b.modified).then_with(by_name),
            SortOrder::NameAsc => by_name(),
            SortOrder::NameDesc => by_name().reverse(),
        }
    }

    pub fn sort(self, items: &mut [MediaItem]) {
        items.sort_by(|a, b| self.compare(a, b));
    }
}
