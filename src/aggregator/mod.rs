pub mod error;
mod feed;
mod source;

pub use error::AggregatorError;
pub use feed::{ImageFeed, Snapshot};
pub use source::ImageSource;

use crate::changes::NodeChangeBus;
use crate::media::{Handle, MediaItem};
use crate::repository::{DynNodeRepository, NodeRepository};
use source::ResolvedSource;
use tracing::{debug, info, warn};

/// Resolves image sources into live feeds for the viewer.
#[derive(Clone)]
pub struct ImageHandleAggregator {
    repository: DynNodeRepository,
    changes: NodeChangeBus,
}

impl ImageHandleAggregator {
    pub fn new(repository: DynNodeRepository, changes: NodeChangeBus) -> Self {
        Self {
            repository,
            changes,
        }
    }

    /// Resolve `source` and start following node changes.
    ///
    /// Fails before anything is published when no source variant is usable,
    /// when the parent folder does not exist, or when a non-empty source has
    /// nothing the viewer can show.
    pub async fn resolve(
        &self,
        source: &ImageSource,
        current_handle: Option<Handle>,
    ) -> Result<ImageFeed, AggregatorError> {
        let resolved = source.resolve()?;

        // Subscribe first so changes racing the initial listing still arrive
        let changes = self.changes.subscribe();

        let listed = list_source(self.repository.as_ref(), &resolved).await?;
        let listed_count = listed.len();
        let items: Vec<MediaItem> = listed
            .into_iter()
            .filter(MediaItem::is_valid_for_viewer)
            .collect();

        // An explicit list counts as non-empty even when none of its
        // entries resolved
        let requested = resolved.requested().unwrap_or(listed_count);
        if items.is_empty() && requested > 0 {
            return Err(AggregatorError::NoValidItems);
        }

        info!(
            "Resolved {:?} into {} of {} items",
            resolved,
            items.len(),
            requested
        );

        Ok(ImageFeed::start(
            self.repository.clone(),
            resolved,
            items,
            changes,
            current_handle,
        ))
    }
}

/// Everything the source currently lists, before the validity filter.
pub(crate) async fn list_source(
    repository: &dyn NodeRepository,
    source: &ResolvedSource,
) -> Result<Vec<MediaItem>, AggregatorError> {
    match source {
        ResolvedSource::Parent { handle, sort } => {
            if repository.get_node(*handle).await?.is_none() {
                return Err(AggregatorError::NodeNotFound(*handle));
            }
            Ok(repository.list_children(*handle, *sort).await?)
        }
        ResolvedSource::Handles {
            handles,
            offline: true,
        } => Ok(offline_items(handles)),
        ResolvedSource::Handles { handles, .. } => {
            let mut items = Vec::with_capacity(handles.len());
            for handle in handles {
                match repository.get_node(*handle).await? {
                    Some(item) => items.push(item),
                    None => debug!("Skipping unknown node {}", handle),
                }
            }
            Ok(items)
        }
        ResolvedSource::PublicLinks(links) => {
            let mut items = Vec::with_capacity(links.len());
            for link in links {
                match repository.get_public_node(link).await {
                    Ok(Some(item)) => items.push(item.with_public_link(link.as_str())),
                    Ok(None) => debug!("Public link {} did not resolve", link),
                    Err(e) => warn!("Failed to resolve public link {}: {}", link, e),
                }
            }
            Ok(items)
        }
        ResolvedSource::Offline(handle) => Ok(offline_items(std::slice::from_ref(handle))),
        ResolvedSource::Online(handle) => match repository.get_node(*handle).await? {
            Some(item) => Ok(vec![item]),
            None => Err(AggregatorError::NodeNotFound(*handle)),
        },
    }
}

fn offline_items(handles: &[Handle]) -> Vec<MediaItem> {
    handles.iter().copied().map(MediaItem::offline).collect()
}
