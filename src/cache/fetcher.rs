use super::{CacheGate, CacheKind};
use crate::media::MediaItem;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// `tokio::time::interval` rejects a zero period.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

struct FetchRequest {
    item: MediaItem,
    kind: CacheKind,
}

/// Paced dispatch queue in front of a [`CacheGate`].
///
/// A single worker pops one pending request per interval, so a large backlog
/// of missing renditions reaches the transfer layer gradually instead of in
/// one burst. Duplicates are filtered by the gate when they are popped.
pub struct ThrottledFetcher {
    sender: mpsc::UnboundedSender<FetchRequest>,
    cancel: CancellationToken,
    worker: JoinHandle<()>,
}

impl ThrottledFetcher {
    pub fn spawn(gate: CacheGate, interval: Duration) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let worker = tokio::spawn(run_worker(gate, interval, receiver, cancel.clone()));

        Self {
            sender,
            cancel,
            worker,
        }
    }

    pub fn submit(&self, item: MediaItem, kind: CacheKind) -> bool {
        self.sender.send(FetchRequest { item, kind }).is_ok()
    }

    /// Queue a batch, returning how many requests were accepted.
    pub fn submit_batch<I>(&self, items: I, kind: CacheKind) -> usize
    where
        I: IntoIterator<Item = MediaItem>,
    {
        items
            .into_iter()
            .take_while(|item| self.submit(item.clone(), kind))
            .count()
    }

    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    pub fn is_running(&self) -> bool {
        !self.worker.is_finished()
    }
}

impl Drop for ThrottledFetcher {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run_worker(
    gate: CacheGate,
    interval: Duration,
    mut receiver: mpsc::UnboundedReceiver<FetchRequest>,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval.max(MIN_INTERVAL));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let request = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            request = receiver.recv() => match request {
                Some(request) => request,
                None => break,
            },
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let outcome = gate.ensure(&request.item, request.kind).await;
        debug!(
            "Dispatched {} for {}: {:?}",
            request.kind,
            request.item.base64_handle(),
            outcome
        );
    }

    info!("Throttled fetcher stopped");
}
