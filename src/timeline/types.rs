use crate::cache::CacheKind;
use crate::media::{Handle, MediaItem};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Granularity of the timeline separators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoomLevel {
    Year,
    #[default]
    Month,
    Day,
}

impl ZoomLevel {
    pub fn bucket_key(self, date: NaiveDate) -> BucketKey {
        match self {
            ZoomLevel::Year => BucketKey::Year(date.year()),
            ZoomLevel::Month => BucketKey::Month(date.year(), date.month()),
            ZoomLevel::Day => BucketKey::Day(date),
        }
    }

    /// Which cached image backs a timeline entry at this zoom. The day view
    /// shows large cells, so it uses previews to avoid blurry thumbnails.
    pub fn image_kind(self) -> CacheKind {
        match self {
            ZoomLevel::Day => CacheKind::Preview,
            ZoomLevel::Year | ZoomLevel::Month => CacheKind::Thumbnail,
        }
    }
}

impl FromStr for ZoomLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "year" | "years" => Ok(ZoomLevel::Year),
            "month" | "months" => Ok(ZoomLevel::Month),
            "day" | "days" => Ok(ZoomLevel::Day),
            other => Err(format!("unknown zoom level: {}", other)),
        }
    }
}

impl fmt::Display for ZoomLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ZoomLevel::Year => "year",
            ZoomLevel::Month => "month",
            ZoomLevel::Day => "day",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BucketKey {
    Year(i32),
    Month(i32, u32),
    Day(NaiveDate),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BucketLabel {
    pub primary: String,
    /// Only set when the bucket is not in the current year.
    pub year: Option<String>,
}

impl fmt::Display for BucketLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.year {
            Some(year) => write!(f, "{} {}", self.primary, year),
            None => f.write_str(&self.primary),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateBucket {
    pub key: BucketKey,
    pub label: BucketLabel,
    /// Date of the first item seen in the bucket.
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CuNode {
    pub item: MediaItem,
    pub index: usize,
    pub photo_index: Option<usize>,
    /// Local image file backing the entry, if already cached.
    pub image_path: Option<PathBuf>,
    pub date_label: String,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TimelineEntry {
    Separator(DateBucket),
    Media(CuNode),
}

impl TimelineEntry {
    pub fn as_media(&self) -> Option<&CuNode> {
        match self {
            TimelineEntry::Media(node) => Some(node),
            TimelineEntry::Separator(_) => None,
        }
    }

    pub fn as_separator(&self) -> Option<&DateBucket> {
        match self {
            TimelineEntry::Separator(bucket) => Some(bucket),
            TimelineEntry::Media(_) => None,
        }
    }

    pub fn handle(&self) -> Option<Handle> {
        self.as_media().map(|node| node.item.handle)
    }
}

/// Result of one full timeline build.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Timeline {
    pub zoom: ZoomLevel,
    pub entries: Vec<TimelineEntry>,
    #[serde(skip)]
    pub missing_thumbnails: Vec<MediaItem>,
    #[serde(skip)]
    pub missing_previews: Vec<MediaItem>,
}

impl Timeline {
    pub fn media(&self) -> impl Iterator<Item = &CuNode> {
        self.entries.iter().filter_map(TimelineEntry::as_media)
    }

    pub fn separators(&self) -> impl Iterator<Item = &DateBucket> {
        self.entries.iter().filter_map(TimelineEntry::as_separator)
    }

    /// Number of media entries, separators excluded.
    pub fn real_count(&self) -> usize {
        self.media().count()
    }

    pub fn photo_count(&self) -> usize {
        self.media().filter(|node| node.item.is_photo()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Position in `entries` of the media entry with this handle.
    pub fn position_of(&self, handle: Handle) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.handle() == Some(handle))
    }

    pub fn photo_handles(&self) -> Vec<Handle> {
        self.media()
            .filter(|node| node.item.is_photo())
            .map(|node| node.item.handle)
            .collect()
    }
}
