use crate::media::MediaItem;
use crate::transfer::{FetchError, TransferService};
use async_trait::async_trait;
use std::path::Path;
use tracing::info;

/// Transfer service that never downloads anything. Every request is logged
/// and reported as unavailable, so nothing is ever written to the cache.
pub struct NullTransfer;

impl NullTransfer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for NullTransfer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TransferService for NullTransfer {
    async fn fetch_thumbnail(
        &self,
        item: &MediaItem,
        destination: &Path,
    ) -> Result<(), FetchError> {
        info!(
            "NULL TRANSFER - Would fetch thumbnail of {} ({}) into {}",
            item.name,
            item.base64_handle(),
            destination.display()
        );
        Err(FetchError::Unavailable(format!(
            "no transfer backend for thumbnail {}",
            item.base64_handle()
        )))
    }

    async fn fetch_preview(&self, item: &MediaItem, destination: &Path) -> Result<(), FetchError> {
        info!(
            "NULL TRANSFER - Would fetch preview of {} ({}) into {}",
            item.name,
            item.base64_handle(),
            destination.display()
        );
        Err(FetchError::Unavailable(format!(
            "no transfer backend for preview {}",
            item.base64_handle()
        )))
    }

    fn name(&self) -> &str {
        "Null Transfer (Logging Only)"
    }
}
