use super::source::ResolvedSource;
use crate::changes::{ChangeBatch, NodeChange};
use crate::media::{Handle, MediaItem};
use crate::repository::{DynNodeRepository, RepositoryError};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub type Snapshot = Arc<Vec<MediaItem>>;

/// Live, ordered list of viewer items.
///
/// The first call to [`ImageFeed::next`] yields the initial list, even when
/// changes were applied in the meantime; every later call waits for the
/// next snapshot the worker has not delivered yet.
/// Cancelling (or dropping) the feed stops the worker, and `next` returns
/// `None` from then on.
pub struct ImageFeed {
    receiver: watch::Receiver<Snapshot>,
    cancel: CancellationToken,
    worker: JoinHandle<()>,
    initial_position: Option<usize>,
    initial: Option<Snapshot>,
}

impl ImageFeed {
    pub(crate) fn start(
        repository: DynNodeRepository,
        source: ResolvedSource,
        items: Vec<MediaItem>,
        changes: broadcast::Receiver<ChangeBatch>,
        current_handle: Option<Handle>,
    ) -> Self {
        let initial_position =
            current_handle.and_then(|handle| items.iter().position(|item| item.handle == handle));
        let initial = Arc::new(items.clone());
        let (sender, receiver) = watch::channel(initial.clone());
        let cancel = CancellationToken::new();

        let list = LiveList {
            repository,
            scope: source.parent(),
            source,
            items,
            sender,
        };
        let worker = tokio::spawn(list.run(changes, cancel.clone()));

        Self {
            receiver,
            cancel,
            worker,
            initial_position,
            initial: Some(initial),
        }
    }

    /// Position of the requested current handle in the initial list.
    pub fn initial_position(&self) -> Option<usize> {
        self.initial_position
    }

    /// The latest published list.
    pub fn current(&self) -> Snapshot {
        self.receiver.borrow().clone()
    }

    /// A receiver for consumers that only care about the latest list.
    pub fn watch(&self) -> watch::Receiver<Snapshot> {
        self.receiver.clone()
    }

    pub async fn next(&mut self) -> Option<Snapshot> {
        if self.cancel.is_cancelled() {
            return None;
        }

        // The receiver starts with the initial list marked as seen, so a
        // batch applied before this call is still delivered by the next one
        if let Some(initial) = self.initial.take() {
            return Some(initial);
        }

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            changed = self.receiver.changed() => match changed {
                Ok(()) if !self.cancel.is_cancelled() => {
                    Some(self.receiver.borrow_and_update().clone())
                }
                _ => None,
            },
        }
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Whether the worker has exited.
    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }
}

impl Drop for ImageFeed {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

struct LiveList {
    repository: DynNodeRepository,
    source: ResolvedSource,
    /// Parent folder in parent mode.
    scope: Option<Handle>,
    items: Vec<MediaItem>,
    sender: watch::Sender<Snapshot>,
}

impl LiveList {
    async fn run(mut self, mut changes: broadcast::Receiver<ChangeBatch>, cancel: CancellationToken) {
        loop {
            let received = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = self.sender.closed() => break,
                received = changes.recv() => received,
            };

            let batch = match received {
                Ok(batch) => batch,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(
                        "Image feed lagged behind, {} change batches skipped, listing again",
                        skipped
                    );
                    if let Err(e) = self.relist().await {
                        warn!("Failed to list {:?} again: {}", self.source, e);
                        continue;
                    }
                    if cancel.is_cancelled() {
                        break;
                    }
                    self.sender.send_replace(Arc::new(self.items.clone()));
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };

            for change in batch.iter() {
                if let Err(e) = self.apply(change).await {
                    warn!(
                        "Skipping change for {}: {}",
                        change.node.base64_handle(),
                        e
                    );
                }
            }

            if cancel.is_cancelled() {
                break;
            }
            self.sender.send_replace(Arc::new(self.items.clone()));
        }

        info!("Image feed stopped with {} items", self.items.len());
    }

    async fn apply(&mut self, change: &NodeChange) -> Result<(), RepositoryError> {
        let node = &change.node;
        let flags = change.flags;
        let index = self.position(node.handle);

        if flags.is_arrival() {
            let in_scope = self.in_scope(node).await?;
            match index {
                Some(index) if in_scope => {
                    self.items[index] = refreshed(&self.items[index], node);
                    debug!("Moved {} within the list", node.base64_handle());
                }
                None if in_scope && node.is_valid_for_viewer() => {
                    self.items.push(node.clone());
                    debug!("Appended {}", node.base64_handle());
                }
                Some(index) if flags.parent_changed => {
                    self.items.remove(index);
                    debug!("Removed {}, it left the list", node.base64_handle());
                }
                _ => {}
            }
        } else if let Some(index) = index {
            if flags.removed {
                self.items.remove(index);
                debug!("Removed {}", node.base64_handle());
            } else {
                self.items[index] = refreshed(&self.items[index], node);
            }
        }

        Ok(())
    }

    /// Replace the list with what the source holds now.
    async fn relist(&mut self) -> Result<(), super::AggregatorError> {
        let listed = super::list_source(self.repository.as_ref(), &self.source).await?;
        self.items = listed
            .into_iter()
            .filter(MediaItem::is_valid_for_viewer)
            .collect();
        info!("Listed {} items after falling behind", self.items.len());
        Ok(())
    }

    fn position(&self, handle: Handle) -> Option<usize> {
        self.items.iter().position(|item| item.handle == handle)
    }

    /// Whether `node` now belongs in this list: same parent as the parent
    /// folder in parent mode, otherwise same parent as the first regular
    /// item of the list.
    async fn in_scope(&self, node: &MediaItem) -> Result<bool, RepositoryError> {
        let Some(parent) = node.parent_handle else {
            return Ok(false);
        };

        if let Some(scope) = self.scope {
            return Ok(parent == scope);
        }

        let Some(reference) = self
            .items
            .iter()
            .find(|item| !item.is_offline && item.public_link.is_none())
        else {
            return Ok(false);
        };

        let reference = self.repository.get_node(reference.handle).await?;
        Ok(reference.and_then(|item| item.parent_handle) == Some(parent))
    }
}

/// The updated node in place of `existing`, keeping how it was sourced.
fn refreshed(existing: &MediaItem, node: &MediaItem) -> MediaItem {
    let mut updated = node.clone();
    updated.is_offline = existing.is_offline;
    if updated.public_link.is_none() {
        updated.public_link = existing.public_link.clone();
    }
    updated.dirty()
}
