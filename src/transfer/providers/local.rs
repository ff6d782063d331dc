use crate::cache::{CACHE_EXTENSION, CacheKind};
use crate::media::MediaItem;
use crate::transfer::{FetchError, TransferService};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Serves renditions from a local mirror directory laid out as
/// `<root>/thumbnails/<handle>.jpg` and `<root>/previews/<handle>.jpg`.
pub struct LocalMirrorTransfer {
    root: PathBuf,
}

impl LocalMirrorTransfer {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn source_path(&self, kind: CacheKind, item: &MediaItem) -> PathBuf {
        let folder = match kind {
            CacheKind::Thumbnail => "thumbnails",
            CacheKind::Preview => "previews",
        };
        self.root
            .join(folder)
            .join(format!("{}.{}", item.base64_handle(), CACHE_EXTENSION))
    }

    async fn copy_rendition(
        &self,
        kind: CacheKind,
        item: &MediaItem,
        destination: &Path,
    ) -> Result<(), FetchError> {
        let source = self.source_path(kind, item);
        if !tokio::fs::try_exists(&source).await? {
            return Err(FetchError::Unavailable(format!(
                "{} not found in mirror",
                source.display()
            )));
        }

        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Readers only check for existence, so the file must appear complete.
        let partial = destination.with_extension("part");
        tokio::fs::copy(&source, &partial).await?;
        tokio::fs::rename(&partial, destination).await?;

        debug!(
            "Copied {} {} -> {}",
            kind,
            source.display(),
            destination.display()
        );
        Ok(())
    }
}

#[async_trait]
impl TransferService for LocalMirrorTransfer {
    async fn fetch_thumbnail(
        &self,
        item: &MediaItem,
        destination: &Path,
    ) -> Result<(), FetchError> {
        self.copy_rendition(CacheKind::Thumbnail, item, destination)
            .await
    }

    async fn fetch_preview(&self, item: &MediaItem, destination: &Path) -> Result<(), FetchError> {
        self.copy_rendition(CacheKind::Preview, item, destination)
            .await
    }

    fn name(&self) -> &str {
        "Local Mirror Transfer"
    }
}
