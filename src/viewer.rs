use crate::aggregator::{ImageFeed, Snapshot};
use crate::media::{Handle, MediaItem};
use std::sync::Arc;
use tracing::debug;

/// Position and contents of the image viewer.
#[derive(Debug, Clone, Default)]
pub struct ViewerState {
    images: Snapshot,
    current_handle: Option<Handle>,
    initial_position: Option<usize>,
}

impl ViewerState {
    pub fn new(current_handle: Option<Handle>) -> Self {
        Self {
            images: Arc::new(Vec::new()),
            current_handle,
            initial_position: None,
        }
    }

    pub fn from_feed(feed: &ImageFeed, current_handle: Option<Handle>) -> Self {
        let mut state = Self::new(current_handle);
        state.apply_snapshot(feed.current());
        state.initial_position = feed.initial_position().or(state.initial_position);
        state
    }

    /// Replace the image list with a newer snapshot.
    ///
    /// The first snapshot that contains the current handle fixes the initial
    /// position. If the current image disappeared, the viewer stays on the
    /// same position, clamped to the new list.
    pub fn apply_snapshot(&mut self, images: Snapshot) {
        let previous = self.current_position();
        self.images = images;

        if self.initial_position.is_none() {
            self.initial_position = self.current_position();
        }

        if self.current_position().is_none()
            && let Some(position) = previous
        {
            let position = position.min(self.images.len().saturating_sub(1));
            self.current_handle = self.images.get(position).map(|item| item.handle);
            debug!("Current image gone, moved to position {}", position);
        }
    }

    /// Called when the user pages to `position`; returns the new handle.
    pub fn update_current_position(&mut self, position: usize) -> Option<Handle> {
        let handle = self.images.get(position)?.handle;
        self.current_handle = Some(handle);
        Some(handle)
    }

    pub fn current_handle(&self) -> Option<Handle> {
        self.current_handle
    }

    pub fn current_position(&self) -> Option<usize> {
        let handle = self.current_handle?;
        self.images.iter().position(|item| item.handle == handle)
    }

    pub fn current_image(&self) -> Option<&MediaItem> {
        self.current_position().and_then(|position| self.images.get(position))
    }

    pub fn initial_position(&self) -> Option<usize> {
        self.initial_position
    }

    pub fn image(&self, handle: Handle) -> Option<&MediaItem> {
        self.images.iter().find(|item| item.handle == handle)
    }

    pub fn images(&self) -> &[MediaItem] {
        &self.images
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}
