pub mod error;
pub mod providers;

pub use error::*;

use crate::cache::CacheKind;
use crate::media::MediaItem;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Downloads cached renditions of remote nodes to local files.
#[async_trait]
pub trait TransferService: Send + Sync {
    async fn fetch_thumbnail(&self, item: &MediaItem, destination: &Path)
    -> Result<(), FetchError>;

    async fn fetch_preview(&self, item: &MediaItem, destination: &Path) -> Result<(), FetchError>;

    fn name(&self) -> &str;

    async fn fetch(
        &self,
        kind: CacheKind,
        item: &MediaItem,
        destination: &Path,
    ) -> Result<(), FetchError> {
        match kind {
            CacheKind::Thumbnail => self.fetch_thumbnail(item, destination).await,
            CacheKind::Preview => self.fetch_preview(item, destination).await,
        }
    }
}

pub type DynTransferService = Arc<dyn TransferService>;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum TransferConfig {
    #[default]
    Null,
    Local(LocalMirrorConfig),
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LocalMirrorConfig {
    /// Directory holding `thumbnails/` and `previews/` renditions.
    pub directory: PathBuf,
}

pub fn create_transfer(config: &TransferConfig) -> DynTransferService {
    match config {
        TransferConfig::Null => Arc::new(providers::null::NullTransfer::new()),
        TransferConfig::Local(local) => Arc::new(providers::local::LocalMirrorTransfer::new(
            local.directory.clone(),
        )),
    }
}
