// Thumbnail and preview cache - deduplicated, paced background fetches
mod fetcher;
mod gate;
mod paths;

pub use fetcher::ThrottledFetcher;
pub use gate::{CacheEvent, CacheGate, EnsureOutcome};
pub use paths::{CACHE_EXTENSION, CachePaths};

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheKind {
    Thumbnail,
    Preview,
}

impl fmt::Display for CacheKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKind::Thumbnail => f.write_str("thumbnail"),
            CacheKind::Preview => f.write_str("preview"),
        }
    }
}
