use super::labels::{bucket_label, date_label};
use super::types::{BucketKey, CuNode, DateBucket, Timeline, TimelineEntry, ZoomLevel};
use crate::cache::{CacheKind, CachePaths};
use crate::media::MediaItem;
use crate::selection::SelectionSet;
use chrono::{NaiveDate, Utc};
use tracing::debug;

/// Interleaves date separators with media entries for one zoom level.
pub struct TimelineBuilder<'a> {
    paths: &'a CachePaths,
    zoom: ZoomLevel,
    today: NaiveDate,
    query: Option<String>,
}

impl<'a> TimelineBuilder<'a> {
    pub fn new(paths: &'a CachePaths, zoom: ZoomLevel) -> Self {
        Self {
            paths,
            zoom,
            today: Utc::now().date_naive(),
            query: None,
        }
    }

    /// Reference date deciding whether year labels are shown.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Keep only items whose name contains `query`, ignoring case.
    pub fn with_query(mut self, query: Option<String>) -> Self {
        self.query = query
            .map(|q| q.trim().to_lowercase())
            .filter(|q| !q.is_empty());
        self
    }

    /// Build the timeline from items sorted newest first.
    pub fn build(&self, items: &[MediaItem], selection: &SelectionSet) -> Timeline {
        let mut timeline = Timeline {
            zoom: self.zoom,
            ..Timeline::default()
        };

        let mut last_key: Option<BucketKey> = None;
        let mut index = 0;
        let mut photo_index = 0;

        for item in items.iter().filter(|item| self.matches_query(item)) {
            let date = item.modified_date();
            let key = self.zoom.bucket_key(date);

            if last_key != Some(key) {
                last_key = Some(key);
                timeline.entries.push(TimelineEntry::Separator(DateBucket {
                    key,
                    label: bucket_label(self.zoom, date, self.today),
                    date,
                }));
            }

            let thumbnail = self.paths.existing(CacheKind::Thumbnail, item.handle);
            let image_path = match self.zoom.image_kind() {
                CacheKind::Thumbnail => thumbnail.clone(),
                CacheKind::Preview => {
                    let preview = self.paths.existing(CacheKind::Preview, item.handle);
                    if preview.is_none() {
                        timeline.missing_previews.push(item.clone());
                    }
                    preview
                }
            };
            if thumbnail.is_none() {
                timeline.missing_thumbnails.push(item.clone());
            }

            let node_photo_index = item.is_photo().then(|| {
                photo_index += 1;
                photo_index - 1
            });

            timeline.entries.push(TimelineEntry::Media(CuNode {
                item: item.clone(),
                index,
                photo_index: node_photo_index,
                image_path,
                date_label: date_label(date),
                selected: selection.contains(item.handle),
            }));
            index += 1;
        }

        debug!(
            "Built {} timeline: {} entries, {} media, {} missing thumbnails, {} missing previews",
            self.zoom,
            timeline.entries.len(),
            index,
            timeline.missing_thumbnails.len(),
            timeline.missing_previews.len()
        );

        timeline
    }

    fn matches_query(&self, item: &MediaItem) -> bool {
        match &self.query {
            Some(query) => item.name.to_lowercase().contains(query.as_str()),
            None => true,
        }
    }
}
