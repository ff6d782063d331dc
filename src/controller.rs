use crate::TimelineConfig;
use crate::cache::{CacheGate, CacheKind, ThrottledFetcher};
use crate::media::{Handle, MediaItem};
use crate::repository::{DynNodeRepository, RepositoryError, SortOrder};
use crate::selection::{ClickOutcome, SelectionController};
use crate::timeline::{
    DateCard, DateCards, DateCardsProvider, Timeline, TimelineBuilder, TimelineEntry, ZoomLevel,
    day_clicked, month_clicked, year_clicked,
};
use chrono::Utc;
use std::sync::{Arc, Weak};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("Repository error: {0}")]
    RepositoryError(#[from] RepositoryError),

    #[error("Background task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),
}

struct ScreenState {
    zoom: ZoomLevel,
    query: Option<String>,
    selection: SelectionController,
    timeline: Timeline,
}

impl ScreenState {
    /// Store a freshly built timeline, flagging entries from the selection
    /// as it is now rather than when the build started.
    fn install(&mut self, mut timeline: Timeline) {
        for entry in timeline.entries.iter_mut() {
            if let TimelineEntry::Media(node) = entry {
                node.selected = self.selection.selection().contains(node.item.handle);
            }
        }
        self.timeline = timeline;
    }
}

/// State of one camera uploads screen.
///
/// Rebuilds go through the repository, the timeline builder and the
/// throttled fetcher; results are published on `watch` channels so readers
/// always see whole timelines.
pub struct CameraUploadsController {
    repository: DynNodeRepository,
    gate: CacheGate,
    fetcher: ThrottledFetcher,
    container: Handle,
    refresh_throttle: Duration,
    state: Mutex<ScreenState>,
    timeline: watch::Sender<Arc<Timeline>>,
    cards: watch::Sender<Arc<DateCards>>,
    cancel: CancellationToken,
}

impl CameraUploadsController {
    pub fn new(
        repository: DynNodeRepository,
        gate: CacheGate,
        container: Handle,
        config: &TimelineConfig,
        fetch_interval: Duration,
    ) -> Self {
        let fetcher = ThrottledFetcher::spawn(gate.clone(), fetch_interval);
        let (timeline, _) = watch::channel(Arc::new(Timeline::default()));
        let (cards, _) = watch::channel(Arc::new(DateCards::default()));

        Self {
            repository,
            gate,
            fetcher,
            container,
            refresh_throttle: config.refresh_throttle(),
            state: Mutex::new(ScreenState {
                zoom: config.default_zoom,
                query: None,
                selection: SelectionController::new(config.open_throttle()),
                timeline: Timeline::default(),
            }),
            timeline,
            cards,
            cancel: CancellationToken::new(),
        }
    }

    pub fn subscribe_timeline(&self) -> watch::Receiver<Arc<Timeline>> {
        self.timeline.subscribe()
    }

    pub fn subscribe_cards(&self) -> watch::Receiver<Arc<DateCards>> {
        self.cards.subscribe()
    }

    pub fn timeline(&self) -> Arc<Timeline> {
        self.timeline.borrow().clone()
    }

    pub fn cards(&self) -> Arc<DateCards> {
        self.cards.borrow().clone()
    }

    pub fn gate(&self) -> &CacheGate {
        &self.gate
    }

    pub async fn zoom(&self) -> ZoomLevel {
        self.state.lock().await.zoom
    }

    pub async fn set_zoom(&self, zoom: ZoomLevel) -> Result<Arc<Timeline>, ControllerError> {
        self.state.lock().await.zoom = zoom;
        self.rebuild().await
    }

    pub async fn set_query(&self, query: Option<String>) -> Result<Arc<Timeline>, ControllerError> {
        self.state.lock().await.query = query;
        self.rebuild().await
    }

    /// Media of the camera uploads folder, newest first.
    async fn list_media(&self) -> Result<Vec<MediaItem>, RepositoryError> {
        let mut items = self
            .repository
            .list_children(self.container, SortOrder::ModificationDesc)
            .await?;
        items.retain(MediaItem::is_valid_for_viewer);
        Ok(items)
    }

    /// List the folder again, rebuild the timeline and queue missing
    /// renditions for fetching.
    pub async fn rebuild(&self) -> Result<Arc<Timeline>, ControllerError> {
        let items = self.list_media().await?;
        let (zoom, query, selection) = {
            let state = self.state.lock().await;
            (
                state.zoom,
                state.query.clone(),
                state.selection.selection().clone(),
            )
        };

        let paths = self.gate.paths().clone();
        let timeline = tokio::task::spawn_blocking(move || {
            TimelineBuilder::new(&paths, zoom)
                .with_query(query)
                .build(&items, &selection)
        })
        .await?;

        let thumbnails = self
            .fetcher
            .submit_batch(timeline.missing_thumbnails.iter().cloned(), CacheKind::Thumbnail);
        let previews = self
            .fetcher
            .submit_batch(timeline.missing_previews.iter().cloned(), CacheKind::Preview);
        debug!(
            "Queued {} thumbnails and {} previews for fetching",
            thumbnails, previews
        );

        // Clicks may have changed the selection while the build ran
        let mut state = self.state.lock().await;
        state.install(timeline);
        Ok(self.publish(&state))
    }

    /// Recompute the day, month and year cards.
    pub async fn refresh_cards(&self) -> Result<Arc<DateCards>, ControllerError> {
        let items = self.list_media().await?;
        let paths = self.gate.paths().clone();
        let cards =
            tokio::task::spawn_blocking(move || DateCardsProvider::new(&paths).extract(&items))
                .await?;

        let queued = self
            .fetcher
            .submit_batch(cards.missing_previews.iter().cloned(), CacheKind::Preview);
        debug!("Queued {} card previews for fetching", queued);

        let cards = Arc::new(cards);
        self.cards.send_replace(cards.clone());
        Ok(cards)
    }

    /// The day card at `position`, if it still shows `handle`.
    pub fn day_card_clicked(&self, position: usize, handle: Handle) -> Option<DateCard> {
        day_clicked(position, handle, &self.cards().days).cloned()
    }

    /// Day card position to scroll to after a month card click.
    pub fn month_card_clicked(&self, position: usize, handle: Handle) -> Option<usize> {
        let cards = self.cards();
        let card = cards.months.get(position).filter(|c| c.item.handle == handle)?;
        month_clicked(
            position,
            card,
            &cards.days,
            &cards.months,
            Utc::now().date_naive(),
        )
    }

    /// Month card position to scroll to after a year card click.
    pub fn year_card_clicked(&self, position: usize, handle: Handle) -> Option<usize> {
        let cards = self.cards();
        let card = cards.years.get(position).filter(|c| c.item.handle == handle)?;
        year_clicked(
            position,
            card,
            &cards.months,
            &cards.years,
            Utc::now().date_naive(),
        )
    }

    pub async fn click(&self, position: usize, handle: Handle) -> ClickOutcome {
        let mut state = self.state.lock().await;
        let ScreenState {
            selection,
            timeline,
            ..
        } = &mut *state;
        let outcome = selection.on_node_clicked(position, handle, &mut timeline.entries);
        if matches!(outcome, ClickOutcome::Toggled { .. }) {
            self.publish(&state);
        }
        outcome
    }

    pub async fn long_click(&self, position: usize, handle: Handle) -> ClickOutcome {
        let mut state = self.state.lock().await;
        let ScreenState {
            selection,
            timeline,
            ..
        } = &mut *state;
        let outcome = selection.on_node_long_clicked(position, handle, &mut timeline.entries);
        if matches!(outcome, ClickOutcome::Toggled { .. }) {
            self.publish(&state);
        }
        outcome
    }

    pub async fn select_all(&self) {
        let mut state = self.state.lock().await;
        let ScreenState {
            selection,
            timeline,
            ..
        } = &mut *state;
        selection.select_all(&mut timeline.entries);
        self.publish(&state);
    }

    pub async fn clear_selection(&self) {
        let mut state = self.state.lock().await;
        let ScreenState {
            selection,
            timeline,
            ..
        } = &mut *state;
        selection.clear_selection(&mut timeline.entries);
        self.publish(&state);
    }

    pub async fn selected_items(&self) -> Vec<MediaItem> {
        self.state.lock().await.selection.selected_items()
    }

    /// Selected files and folders.
    pub async fn selection_counts(&self) -> (usize, usize) {
        let state = self.state.lock().await;
        let selection = state.selection.selection();
        (selection.file_count(), selection.folder_count())
    }

    pub async fn action_mode(&self) -> bool {
        self.state.lock().await.selection.action_mode()
    }

    pub async fn take_animations(&self) -> Vec<usize> {
        self.state.lock().await.selection.take_animations()
    }

    fn publish(&self, state: &ScreenState) -> Arc<Timeline> {
        let timeline = Arc::new(state.timeline.clone());
        self.timeline.send_replace(timeline.clone());
        timeline
    }

    /// Rebuild after cached renditions arrive, at most once per refresh
    /// window. Events arriving while a rebuild is pending are folded into it.
    pub fn start_auto_refresh(self: &Arc<Self>) -> JoinHandle<()> {
        let controller = Arc::downgrade(self);
        let events = self.gate.subscribe();
        let cancel = self.cancel.clone();
        let window = self.refresh_throttle;

        tokio::spawn(auto_refresh(controller, events, cancel, window))
    }

    /// Stop the auto refresh task and the fetch queue.
    pub fn shutdown(&self) {
        self.cancel.cancel();
        self.fetcher.shutdown();
    }
}

impl Drop for CameraUploadsController {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn auto_refresh(
    controller: Weak<CameraUploadsController>,
    mut events: broadcast::Receiver<crate::cache::CacheEvent>,
    cancel: CancellationToken,
    window: Duration,
) {
    info!("Auto refresh started with a {:?} window", window);

    loop {
        let received = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            received = events.recv() => received,
        };
        match received {
            Ok(event) => debug!("{} cached for {}", event.kind, event.handle),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                debug!("Auto refresh skipped {} cache events", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(window) => {}
        }

        // Everything that arrived during the window is covered by this rebuild
        while let Ok(_) | Err(broadcast::error::TryRecvError::Lagged(_)) = events.try_recv() {}

        let Some(controller) = controller.upgrade() else {
            break;
        };
        if let Err(e) = controller.rebuild().await {
            warn!("Auto refresh rebuild failed: {}", e);
        }
        if let Err(e) = controller.refresh_cards().await {
            warn!("Auto refresh of date cards failed: {}", e);
        }
    }

    info!("Auto refresh stopped");
}
