use super::{NodeRepository, RepositoryError, SortOrder};
use crate::media::{Handle, MediaItem, MediaKind};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// One node as stored in a JSON listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRecord {
    pub handle: Handle,
    #[serde(default)]
    pub parent: Option<Handle>,
    pub name: String,
    #[serde(default)]
    pub modified: i64,
    /// Derived from the file name when absent.
    #[serde(default)]
    pub kind: Option<MediaKind>,
    #[serde(default)]
    pub public_link: Option<String>,
    #[serde(default)]
    pub in_rubbish: bool,
}

impl From<NodeRecord> for MediaItem {
    fn from(record: NodeRecord) -> Self {
        let mut item = MediaItem::new(record.handle, record.name, record.modified);
        item.parent_handle = record.parent;
        if let Some(kind) = record.kind {
            item.kind = kind;
        }
        item.public_link = record.public_link;
        item.in_rubbish = record.in_rubbish;
        item
    }
}

/// A snapshot of a node tree, usually read from disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeListing {
    /// The camera uploads folder, if the listing names one.
    #[serde(default)]
    pub camera_uploads: Option<Handle>,
    #[serde(default)]
    pub nodes: Vec<NodeRecord>,
}

#[derive(Default)]
struct Nodes {
    by_handle: HashMap<Handle, MediaItem>,
    by_link: HashMap<String, Handle>,
}

/// Node repository held entirely in memory.
#[derive(Default)]
pub struct MemoryRepository {
    nodes: RwLock<Nodes>,
    camera_uploads: Option<Handle>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_listing(listing: NodeListing) -> Self {
        let mut nodes = Nodes::default();
        for record in listing.nodes {
            nodes.insert(record.into());
        }

        Self {
            nodes: RwLock::new(nodes),
            camera_uploads: listing.camera_uploads,
        }
    }

    pub async fn load_from_file(path: &Path) -> Result<Self, RepositoryError> {
        let content = tokio::fs::read_to_string(path).await?;
        let listing: NodeListing = serde_json::from_str(&content)?;
        info!(
            "Loaded {} nodes from {}",
            listing.nodes.len(),
            path.display()
        );
        Ok(Self::from_listing(listing))
    }

    pub fn camera_uploads(&self) -> Option<Handle> {
        self.camera_uploads
    }

    /// Insert or replace a node.
    pub async fn insert(&self, item: MediaItem) {
        self.nodes.write().await.insert(item);
    }

    pub async fn remove(&self, handle: Handle) -> Option<MediaItem> {
        let mut nodes = self.nodes.write().await;
        let removed = nodes.by_handle.remove(&handle)?;
        if let Some(link) = &removed.public_link {
            nodes.by_link.remove(link);
        }
        Some(removed)
    }

    /// Move a node under a new parent, returning the updated node.
    pub async fn move_node(&self, handle: Handle, parent: Handle) -> Option<MediaItem> {
        let mut nodes = self.nodes.write().await;
        let node = nodes.by_handle.get_mut(&handle)?;
        node.parent_handle = Some(parent);
        Some(node.clone())
    }

    pub async fn len(&self) -> usize {
        self.nodes.read().await.by_handle.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Nodes {
    fn insert(&mut self, item: MediaItem) {
        if let Some(link) = &item.public_link {
            self.by_link.insert(link.clone(), item.handle);
        }
        self.by_handle.insert(item.handle, item);
    }
}

#[async_trait]
impl NodeRepository for MemoryRepository {
    async fn list_children(
        &self,
        container: Handle,
        sort: SortOrder,
    ) -> Result<Vec<MediaItem>, RepositoryError> {
        let nodes = self.nodes.read().await;
        let mut children: Vec<MediaItem> = nodes
            .by_handle
            .values()
            .filter(|item| item.parent_handle == Some(container) && !item.in_rubbish)
            .cloned()
            .collect();
        drop(nodes);

        sort.sort(&mut children);
        debug!("Listed {} children of {}", children.len(), container);
        Ok(children)
    }

    async fn get_node(&self, handle: Handle) -> Result<Option<MediaItem>, RepositoryError> {
        Ok(self.nodes.read().await.by_handle.get(&handle).cloned())
    }

    async fn get_public_node(&self, link: &str) -> Result<Option<MediaItem>, RepositoryError> {
        let nodes = self.nodes.read().await;
        Ok(nodes
            .by_link
            .get(link)
            .and_then(|handle| nodes.by_handle.get(handle))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const LISTING: &str = r#"{
        "camera_uploads": 100,
        "nodes": [
            { "handle": 100, "name": "Camera Uploads", "kind": "folder" },
            { "handle": 1, "parent": 100, "name": "a.jpg", "modified": 1709632800 },
            { "handle": 2, "parent": 100, "name": "b.mp4", "modified": 1709719200,
              "public_link": "https://example.invalid/file/b" },
            { "handle": 3, "parent": 100, "name": "c.jpg", "modified": 1709000000,
              "in_rubbish": true },
            { "handle": 4, "parent": 200, "name": "d.jpg", "modified": 1709000000 }
        ]
    }"#;

    #[tokio::test]
    async fn test_load_listing() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nodes.json");
        std::fs::write(&path, LISTING).unwrap();

        let repository = MemoryRepository::load_from_file(&path).await.unwrap();
        assert_eq!(repository.camera_uploads(), Some(100));
        assert_eq!(repository.len().await, 5);

        let folder = repository.get_node(100).await.unwrap().unwrap();
        assert!(folder.is_folder());
        let video = repository.get_node(2).await.unwrap().unwrap();
        assert!(video.is_video());
    }

    #[tokio::test]
    async fn test_list_children_skips_rubbish() {
        let listing: NodeListing = serde_json::from_str(LISTING).unwrap();
        let repository = MemoryRepository::from_listing(listing);

        let children = repository
            .list_children(100, SortOrder::ModificationDesc)
            .await
            .unwrap();
        let handles: Vec<Handle> = children.iter().map(|i| i.handle).collect();
        assert_eq!(handles, vec![2, 1]);
    }

    #[tokio::test]
    async fn test_public_links_and_mutation() {
        let listing: NodeListing = serde_json::from_str(LISTING).unwrap();
        let repository = MemoryRepository::from_listing(listing);

        let node = repository
            .get_public_node("https://example.invalid/file/b")
            .await
            .unwrap();
        assert_eq!(node.map(|n| n.handle), Some(2));

        let moved = repository.move_node(4, 100).await.unwrap();
        assert_eq!(moved.parent_handle, Some(100));

        repository.remove(2).await;
        assert!(
            repository
                .get_public_node("https://example.invalid/file/b")
                .await
                .unwrap()
                .is_none()
        );
        assert!(repository.move_node(2, 100).await.is_none());
    }

    #[test]
    fn test_missing_listing_is_an_error() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let result = runtime.block_on(MemoryRepository::load_from_file(Path::new(
            "/nonexistent/nodes.json",
        )));
        assert!(matches!(result, Err(RepositoryError::IoError(_))));
    }
}
