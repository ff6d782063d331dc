use crate::media::{Handle, MediaItem};
use crate::timeline::TimelineEntry;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Selected items keyed by handle, so reordering the list keeps the
/// selection intact.
#[derive(Debug, Clone, Default)]
pub struct SelectionSet {
    items: HashMap<Handle, MediaItem>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, handle: Handle) -> bool {
        self.items.contains_key(&handle)
    }

    /// Returns true if the item was not selected before.
    pub fn insert(&mut self, item: MediaItem) -> bool {
        self.items.insert(item.handle, item).is_none()
    }

    pub fn remove(&mut self, handle: Handle) -> bool {
        self.items.remove(&handle).is_some()
    }

    /// Flip membership, returning whether the item ends up selected.
    pub fn toggle(&mut self, item: &MediaItem) -> bool {
        if self.remove(item.handle) {
            false
        } else {
            self.insert(item.clone());
            true
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> impl Iterator<Item = &MediaItem> {
        self.items.values()
    }

    pub fn handles(&self) -> Vec<Handle> {
        let mut handles: Vec<Handle> = self.items.keys().copied().collect();
        handles.sort_unstable();
        handles
    }

    pub fn file_count(&self) -> usize {
        self.items().filter(|item| !item.is_folder()).count()
    }

    pub fn folder_count(&self) -> usize {
        self.items().filter(|item| item.is_folder()).count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    /// Selection mode: the entry was toggled.
    Toggled { position: usize, selected: bool },
    /// Not selecting: the entry should be opened.
    Open { position: usize, handle: Handle },
    /// An open request arrived inside the throttle window.
    Throttled,
    /// Position and handle do not match the current list.
    Ignored,
}

/// Selection mode and selected entries of one timeline screen.
#[derive(Debug)]
pub struct SelectionController {
    selection: SelectionSet,
    selecting: bool,
    open_throttle: Duration,
    last_open: Option<Instant>,
    animations: Vec<usize>,
}

impl SelectionController {
    pub fn new(open_throttle: Duration) -> Self {
        Self {
            selection: SelectionSet::new(),
            selecting: false,
            open_throttle,
            last_open: None,
            animations: Vec::new(),
        }
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    pub fn is_selecting(&self) -> bool {
        self.selecting
    }

    /// Whether the contextual action bar should be shown.
    pub fn action_mode(&self) -> bool {
        self.selecting
    }

    pub fn selected_count(&self) -> usize {
        self.selection.len()
    }

    pub fn selected_items(&self) -> Vec<MediaItem> {
        self.selection.items().cloned().collect()
    }

    /// Positions whose selection state changed since the last call.
    pub fn take_animations(&mut self) -> Vec<usize> {
        std::mem::take(&mut self.animations)
    }

    pub fn on_node_clicked(
        &mut self,
        position: usize,
        handle: Handle,
        entries: &mut [TimelineEntry],
    ) -> ClickOutcome {
        if !self.selecting {
            return self.request_open(position, handle);
        }

        let node = match entries.get_mut(position) {
            Some(TimelineEntry::Media(node)) if node.item.handle == handle => node,
            _ => return ClickOutcome::Ignored,
        };

        node.selected = self.selection.toggle(&node.item);
        let selected = node.selected;
        self.selecting = !self.selection.is_empty();
        self.animations.push(position);

        debug!(
            "Toggled selection at {}: selected={}, {} selected",
            position,
            selected,
            self.selection.len()
        );
        ClickOutcome::Toggled { position, selected }
    }

    pub fn on_node_long_clicked(
        &mut self,
        position: usize,
        handle: Handle,
        entries: &mut [TimelineEntry],
    ) -> ClickOutcome {
        self.selecting = true;
        let outcome = self.on_node_clicked(position, handle, entries);
        if outcome == ClickOutcome::Ignored {
            self.selecting = !self.selection.is_empty();
        }
        outcome
    }

    /// Select every media entry currently visible.
    pub fn select_all(&mut self, entries: &mut [TimelineEntry]) {
        if entries.is_empty() {
            return;
        }

        for (position, entry) in entries.iter_mut().enumerate() {
            if let TimelineEntry::Media(node) = entry {
                if !node.selected {
                    self.animations.push(position);
                }
                node.selected = true;
                self.selection.insert(node.item.clone());
            }
        }
        self.selecting = true;
    }

    pub fn clear_selection(&mut self, entries: &mut [TimelineEntry]) {
        if !self.selecting {
            return;
        }
        self.selecting = false;

        for (position, entry) in entries.iter_mut().enumerate() {
            if let TimelineEntry::Media(node) = entry
                && node.selected
            {
                self.animations.push(position);
                node.selected = false;
            }
        }
        self.selection.clear();
    }

    fn request_open(&mut self, position: usize, handle: Handle) -> ClickOutcome {
        let now = Instant::now();
        if let Some(last) = self.last_open
            && now.duration_since(last) < self.open_throttle
        {
            return ClickOutcome::Throttled;
        }

        self.last_open = Some(now);
        ClickOutcome::Open { position, handle }
    }
}
