use super::{CacheKind, CachePaths};
use crate::media::{Handle, MediaItem};
use crate::transfer::DynTransferService;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, warn};

const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsureOutcome {
    /// The file is already on disk, nothing was requested.
    Cached,
    /// A new fetch was issued.
    Requested,
    /// A fetch for this handle is already in flight.
    Outstanding,
}

/// Sent after a rendition has been written to the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEvent {
    pub handle: Handle,
    pub kind: CacheKind,
    pub path: PathBuf,
}

/// Fronts the transfer service so that each missing rendition is fetched at
/// most once at a time.
#[derive(Clone)]
pub struct CacheGate {
    inner: Arc<GateInner>,
}

struct GateInner {
    paths: CachePaths,
    transfer: DynTransferService,
    requested_thumbnails: Mutex<HashSet<Handle>>,
    requested_previews: Mutex<HashSet<Handle>>,
    events: broadcast::Sender<CacheEvent>,
    release_on_failure: bool,
}

impl CacheGate {
    pub fn new(paths: CachePaths, transfer: DynTransferService, release_on_failure: bool) -> Self {
        let (events, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(GateInner {
                paths,
                transfer,
                requested_thumbnails: Mutex::new(HashSet::new()),
                requested_previews: Mutex::new(HashSet::new()),
                events,
                release_on_failure,
            }),
        }
    }

    pub fn paths(&self) -> &CachePaths {
        &self.inner.paths
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.inner.events.subscribe()
    }

    pub async fn ensure_thumbnail(&self, item: &MediaItem) -> EnsureOutcome {
        self.ensure(item, CacheKind::Thumbnail).await
    }

    pub async fn ensure_preview(&self, item: &MediaItem) -> EnsureOutcome {
        self.ensure(item, CacheKind::Preview).await
    }

    pub async fn ensure(&self, item: &MediaItem, kind: CacheKind) -> EnsureOutcome {
        if self.inner.paths.is_cached(kind, item.handle).await {
            return EnsureOutcome::Cached;
        }

        {
            let mut requested = self.inner.requested(kind).lock().await;
            if !requested.insert(item.handle) {
                debug!(
                    "{} for {} already requested",
                    kind,
                    item.base64_handle()
                );
                return EnsureOutcome::Outstanding;
            }
        }

        let inner = self.inner.clone();
        let item = item.clone();
        tokio::spawn(async move { inner.fetch(item, kind).await });

        EnsureOutcome::Requested
    }

    pub async fn is_outstanding(&self, kind: CacheKind, handle: Handle) -> bool {
        self.inner.requested(kind).lock().await.contains(&handle)
    }

    pub async fn outstanding_count(&self, kind: CacheKind) -> usize {
        self.inner.requested(kind).lock().await.len()
    }
}

impl GateInner {
    fn requested(&self, kind: CacheKind) -> &Mutex<HashSet<Handle>> {
        match kind {
            CacheKind::Thumbnail => &self.requested_thumbnails,
            CacheKind::Preview => &self.requested_previews,
        }
    }

    async fn fetch(&self, item: MediaItem, kind: CacheKind) {
        let destination = self.paths.path_for(kind, item.handle);

        let result = match tokio::fs::create_dir_all(self.paths.directory(kind)).await {
            Ok(()) => self.transfer.fetch(kind, &item, &destination).await,
            Err(e) => Err(e.into()),
        };

        match result {
            Ok(()) => {
                self.requested(kind).lock().await.remove(&item.handle);
                debug!("Fetched {} for {}", kind, item.base64_handle());
                // No subscribers is fine
                let _ = self.events.send(CacheEvent {
                    handle: item.handle,
                    kind,
                    path: destination,
                });
            }
            Err(e) => {
                warn!(
                    "Failed to fetch {} for {} ({}): {}",
                    kind,
                    item.name,
                    item.base64_handle(),
                    e
                );
                if self.release_on_failure {
                    self.requested(kind).lock().await.remove(&item.handle);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::{FetchError, TransferService};
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;
    use tokio::sync::{Notify, Semaphore};

    /// Transfer that waits for a permit per request, then writes the file
    /// (or fails).
    struct GatedTransfer {
        calls: AtomicUsize,
        permits: Semaphore,
        finished: Notify,
        fail: bool,
    }

    impl GatedTransfer {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                permits: Semaphore::new(0),
                finished: Notify::new(),
                fail,
            })
        }

        async fn run(&self, destination: &Path) -> Result<(), FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.permits.acquire().await.unwrap().forget();
            let result = if self.fail {
                Err(FetchError::BackendError("boom".to_string()))
            } else {
                tokio::fs::write(destination, b"jpeg").await?;
                Ok(())
            };
            self.finished.notify_one();
            result
        }
    }

    #[async_trait]
    impl TransferService for GatedTransfer {
        async fn fetch_thumbnail(
            &self,
            _item: &MediaItem,
            destination: &Path,
        ) -> Result<(), FetchError> {
            self.run(destination).await
        }

        async fn fetch_preview(
            &self,
            _item: &MediaItem,
            destination: &Path,
        ) -> Result<(), FetchError> {
            self.run(destination).await
        }

        fn name(&self) -> &str {
            "gated"
        }
    }

    fn create_gate(transfer: Arc<GatedTransfer>, release_on_failure: bool) -> (CacheGate, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let gate = CacheGate::new(
            CachePaths::under(temp_dir.path()),
            transfer,
            release_on_failure,
        );
        (gate, temp_dir)
    }

    #[tokio::test]
    async fn test_single_fetch_per_handle() {
        let transfer = GatedTransfer::new(false);
        let (gate, _temp_dir) = create_gate(transfer.clone(), false);
        let mut events = gate.subscribe();
        let item = MediaItem::new(1, "a.jpg", 0);

        assert_eq!(gate.ensure_thumbnail(&item).await, EnsureOutcome::Requested);
        assert_eq!(gate.ensure_thumbnail(&item).await, EnsureOutcome::Outstanding);
        assert!(gate.is_outstanding(CacheKind::Thumbnail, 1).await);

        transfer.permits.add_permits(1);
        let event = events.recv().await.unwrap();
        assert_eq!(event.handle, 1);
        assert_eq!(event.kind, CacheKind::Thumbnail);
        assert_eq!(event.path, gate.paths().thumbnail_path(1));

        assert_eq!(transfer.calls.load(Ordering::SeqCst), 1);
        assert!(!gate.is_outstanding(CacheKind::Thumbnail, 1).await);

        // The file now exists, so no further fetch is issued
        assert_eq!(gate.ensure_thumbnail(&item).await, EnsureOutcome::Cached);
        assert_eq!(transfer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_kinds_are_tracked_separately() {
        let transfer = GatedTransfer::new(false);
        let (gate, _temp_dir) = create_gate(transfer.clone(), false);
        let item = MediaItem::new(3, "c.jpg", 0);

        assert_eq!(gate.ensure_thumbnail(&item).await, EnsureOutcome::Requested);
        assert_eq!(gate.ensure_preview(&item).await, EnsureOutcome::Requested);
        assert_eq!(gate.outstanding_count(CacheKind::Thumbnail).await, 1);
        assert_eq!(gate.outstanding_count(CacheKind::Preview).await, 1);
    }

    #[tokio::test]
    async fn test_already_cached_skips_fetch() {
        let transfer = GatedTransfer::new(false);
        let (gate, _temp_dir) = create_gate(transfer.clone(), false);
        gate.paths().ensure_directories().await.unwrap();
        std::fs::write(gate.paths().preview_path(5), b"jpeg").unwrap();

        let item = MediaItem::new(5, "e.jpg", 0);
        assert_eq!(gate.ensure_preview(&item).await, EnsureOutcome::Cached);
        assert_eq!(gate.outstanding_count(CacheKind::Preview).await, 0);
        assert_eq!(transfer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_marker() {
        let transfer = GatedTransfer::new(true);
        let (gate, _temp_dir) = create_gate(transfer.clone(), false);
        let item = MediaItem::new(2, "b.jpg", 0);

        assert_eq!(gate.ensure_thumbnail(&item).await, EnsureOutcome::Requested);
        transfer.permits.add_permits(1);
        transfer.finished.notified().await;
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        assert!(gate.is_outstanding(CacheKind::Thumbnail, 2).await);
        assert_eq!(gate.ensure_thumbnail(&item).await, EnsureOutcome::Outstanding);
        assert_eq!(transfer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_fetch_released_when_configured() {
        let transfer = GatedTransfer::new(true);
        let (gate, _temp_dir) = create_gate(transfer.clone(), true);
        let item = MediaItem::new(2, "b.jpg", 0);

        assert_eq!(gate.ensure_thumbnail(&item).await, EnsureOutcome::Requested);
        transfer.permits.add_permits(1);
        transfer.finished.notified().await;

        let mut released = false;
        for _ in 0..100 {
            if !gate.is_outstanding(CacheKind::Thumbnail, 2).await {
                released = true;
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(released, "marker should be cleared after a failure");

        assert_eq!(gate.ensure_thumbnail(&item).await, EnsureOutcome::Requested);
    }
}
