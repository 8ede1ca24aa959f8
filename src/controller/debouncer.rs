use std::{collections::HashMap, collections::VecDeque, sync::Arc, time::Duration};

use futures::StreamExt;
use parking_lot::Mutex;
use tokio::sync::mpsc::{self, error::SendError, Sender};
use tokio_util::time::{delay_queue, DelayQueue};
use tracing::{debug, error};

use crate::entity::CanonicalUri;

use super::context::{Ctx, MavenDocumentEvent};

/// Delay after open and save.
pub const INTERACTIVE_DELAY: Duration = Duration::from_millis(100);
/// Lower bound of the delay after edits.
pub const MIN_BACKGROUND_DELAY: Duration = Duration::from_millis(350);
const LATENCY_SAMPLES: usize = 5;

/// Trailing window of measured refresh latencies.
#[derive(Debug, Default)]
pub struct LatencyWindow {
    samples: VecDeque<Duration>,
}

impl LatencyWindow {
    pub fn record(&mut self, latency: Duration) {
        if self.samples.len() == LATENCY_SAMPLES {
            self.samples.pop_front();
        }
        self.samples.push_back(latency);
    }

    pub fn average(&self) -> Option<Duration> {
        if self.samples.is_empty() {
            return None;
        }
        let total: Duration = self.samples.iter().sum();
        Some(total / self.samples.len() as u32)
    }
}

/// `max(350ms, 1.3 × average latency)`
pub fn adaptive_delay(window: &LatencyWindow) -> Duration {
    window
        .average()
        .map(|avg| avg * 13 / 10)
        .unwrap_or_default()
        .max(MIN_BACKGROUND_DELAY)
}

pub enum DebouncerEvent {
    Interactive(Ctx),
    Background(Ctx),
    Cancel(CanonicalUri),
}

/// Per-file debouncing of refreshes. A new event for a file replaces the
/// pending one and restarts its delay; files never delay each other.
pub struct Debouncer {
    sender: Sender<DebouncerEvent>,
    latencies: Arc<Mutex<LatencyWindow>>,
}

impl Debouncer {
    pub fn spawn(tx: Sender<MavenDocumentEvent>) -> Self {
        let (sender, mut rx) = mpsc::channel::<DebouncerEvent>(64);
        let latencies = Arc::new(Mutex::new(LatencyWindow::default()));
        let window = latencies.clone();

        tokio::spawn(async move {
            let mut queue: DelayQueue<CanonicalUri> = DelayQueue::new();
            let mut pending: HashMap<CanonicalUri, (delay_queue::Key, usize)> = HashMap::new();

            loop {
                tokio::select! {
                    some_event = rx.recv() => {
                        let Some(event) = some_event else { break };
                        let (ctx, delay) = match event {
                            DebouncerEvent::Interactive(ctx) => (ctx, INTERACTIVE_DELAY),
                            DebouncerEvent::Background(ctx) => (ctx, adaptive_delay(&window.lock())),
                            DebouncerEvent::Cancel(uri) => {
                                if let Some((key, _)) = pending.remove(&uri) {
                                    queue.remove(&key);
                                }
                                continue;
                            }
                        };
                        debug!("debounce {} rev {} for {:?}", ctx.uri.as_str(), ctx.rev, delay);
                        match pending.get_mut(&ctx.uri) {
                            Some((key, rev)) => {
                                queue.reset(key, delay);
                                *rev = ctx.rev;
                            }
                            None => {
                                let key = queue.insert(ctx.uri.clone(), delay);
                                pending.insert(ctx.uri, (key, ctx.rev));
                            }
                        }
                    }

                    Some(expired) = queue.next(), if !queue.is_empty() => {
                        let uri = expired.into_inner();
                        let Some((_, rev)) = pending.remove(&uri) else { continue };
                        if let Err(e) = tx.send(MavenDocumentEvent::ReadyToRefresh(Ctx { uri, rev })).await {
                            error!("debouncer failed to send ready to refresh: {}", e);
                        }
                    }
                }
            }
        });

        Self { sender, latencies }
    }

    pub async fn send_interactive(&self, ctx: Ctx) -> Result<(), SendError<DebouncerEvent>> {
        self.sender.send(DebouncerEvent::Interactive(ctx)).await
    }

    pub async fn send_background(&self, ctx: Ctx) -> Result<(), SendError<DebouncerEvent>> {
        self.sender.send(DebouncerEvent::Background(ctx)).await
    }

    pub async fn cancel(&self, uri: CanonicalUri) -> Result<(), SendError<DebouncerEvent>> {
        self.sender.send(DebouncerEvent::Cancel(uri)).await
    }

    pub fn record_latency(&self, latency: Duration) {
        self.latencies.lock().record(latency);
    }
}
