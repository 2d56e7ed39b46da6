//! Subscriber fan-out and the polling loop that drives a tracking session.

use std::{
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, Mutex, MutexGuard,
    },
    thread,
    time::Instant,
};

use tokio::sync::{
    mpsc::{self, error::TrySendError},
    oneshot, Notify,
};

use crate::{
    config::{AppConfig, BroadcastConfig},
    landmarks::DetectionFrame,
    session::{FrameOutput, TrackingSession},
    source::FrameSource,
    HandCursorError, Result,
};

/// Identifier handed out by [`SubscriberRegistry::subscribe`].
pub type SubscriberId = u64;

/// Receiving end of a subscription. Each message is one serialised
/// frame output.
#[derive(Debug)]
pub struct Subscription {
    pub id: SubscriberId,
    pub receiver: mpsc::Receiver<Arc<str>>,
}

/// Outcome of delivering one message to every registered subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub skipped: usize,
}

/// Concurrency-safe set of subscribers. Clones share the same set, so the
/// transport layer can register and remove subscribers while the loop
/// broadcasts.
#[derive(Clone)]
pub struct SubscriberRegistry {
    subscribers: Arc<Mutex<Vec<(SubscriberId, mpsc::Sender<Arc<str>>)>>>,
    next_id: Arc<AtomicU64>,
    capacity: usize,
}

impl Default for SubscriberRegistry {
    fn default() -> Self {
        Self::new(BroadcastConfig::default().subscriber_capacity)
    }
}

impl SubscriberRegistry {
    /// `capacity` is the queue depth per subscriber; zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        Self {
            subscribers: Arc::new(Mutex::new(Vec::new())),
            next_id: Arc::new(AtomicU64::new(1)),
            capacity: capacity.max(1),
        }
    }

    pub fn subscribe(&self) -> Result<Subscription> {
        let (sender, receiver) = mpsc::channel(self.capacity);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock()?.push((id, sender));
        tracing::debug!(id, "subscriber registered");
        Ok(Subscription { id, receiver })
    }

    /// Removes a subscriber. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriberId) -> Result<bool> {
        let mut subscribers = self.lock()?;
        let before = subscribers.len();
        subscribers.retain(|(existing, _)| *existing != id);
        let removed = subscribers.len() != before;
        if removed {
            tracing::debug!(id, "subscriber removed");
        }
        Ok(removed)
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.lock()?.is_empty())
    }

    /// Offers `message` to every subscriber without waiting. A subscriber
    /// whose queue is full or whose receiver is gone misses this message;
    /// the others are unaffected. Removing dead subscribers is left to the
    /// caller that registered them.
    pub fn broadcast(&self, message: &Arc<str>) -> Result<DeliveryReport> {
        let subscribers = self.lock()?;
        let mut report = DeliveryReport::default();
        for (id, sender) in subscribers.iter() {
            match sender.try_send(message.clone()) {
                Ok(()) => report.delivered += 1,
                Err(TrySendError::Full(_)) => {
                    tracing::debug!(id, "subscriber queue full, frame skipped");
                    report.skipped += 1;
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::debug!(id, "subscriber disconnected, frame skipped");
                    report.skipped += 1;
                }
            }
        }
        Ok(report)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<(SubscriberId, mpsc::Sender<Arc<str>>)>>> {
        self.subscribers
            .lock()
            .map_err(|_| HandCursorError::Poisoned("subscriber registry"))
    }
}

impl std::fmt::Debug for SubscriberRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberRegistry")
            .field("capacity", &self.capacity)
            .finish()
    }
}

/// Counters reported when the loop exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopSummary {
    pub frames: u64,
    pub detected_frames: u64,
    pub acquisition_failures: u64,
    pub deliveries: u64,
    pub skipped_deliveries: u64,
    /// Frames whose fan-out was abandoned because the registry could not be
    /// read or the output could not be serialised.
    pub failed_fanouts: u64,
}

/// Shared stop signal for a [`BroadcastLoop`]. Clones refer to the same loop
/// and [`StopHandle::stop`] may be called from any thread, including a
/// signal handler.
#[derive(Debug, Clone)]
pub struct StopHandle {
    running: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl StopHandle {
    fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(true)),
            notify: Arc::new(Notify::new()),
        }
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.notify.notify_one();
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Resolves once [`StopHandle::stop`] has been called.
    async fn stopped(&self) {
        while self.is_running() {
            self.notify.notified().await;
        }
    }
}

type Acquired = Result<Option<DetectionFrame>>;

/// Calls [`FrameSource::release`] when dropped, whichever way the
/// acquisition thread exits, then reports the release to the loop.
struct ReleaseGuard<S: FrameSource> {
    source: S,
    released: Option<oneshot::Sender<()>>,
}

impl<S: FrameSource> Drop for ReleaseGuard<S> {
    fn drop(&mut self) {
        self.source.release();
        tracing::info!("capture source released");
        if let Some(released) = self.released.take() {
            let _ = released.send(());
        }
    }
}

/// Loop side of the acquisition thread. Each request produces exactly one
/// `next_frame` call; dropping `requests` lets the thread exit and release
/// the source once any read in progress returns.
struct Acquisition {
    requests: std::sync::mpsc::Sender<()>,
    frames: mpsc::Receiver<Acquired>,
    released: oneshot::Receiver<()>,
}

impl Acquisition {
    fn spawn<S: FrameSource + 'static>(source: S) -> Result<Self> {
        let (requests, pending) = std::sync::mpsc::channel::<()>();
        let (frame_tx, frames) = mpsc::channel(1);
        let (released_tx, released) = oneshot::channel();

        thread::Builder::new()
            .name("frame-acquisition".into())
            .spawn(move || {
                let mut guard = ReleaseGuard {
                    source,
                    released: Some(released_tx),
                };
                while pending.recv().is_ok() {
                    let acquired = guard.source.next_frame();
                    if frame_tx.blocking_send(acquired).is_err() {
                        break;
                    }
                }
            })
            .map_err(|err| {
                HandCursorError::msg(format!("failed to spawn acquisition thread: {err}"))
            })?;

        Ok(Self {
            requests,
            frames,
            released,
        })
    }
}

/// Pulls frames from a source, runs them through a [`TrackingSession`] and
/// fans the results out to subscribers until stopped or the source runs dry.
///
/// The source is driven from a dedicated thread so a read that blocks (an
/// idle pipe, a stalled camera) never holds up the async runtime or the
/// stop signal.
pub struct BroadcastLoop<S: FrameSource> {
    source: S,
    session: TrackingSession,
    registry: SubscriberRegistry,
    settings: BroadcastConfig,
    stop: StopHandle,
}

impl<S: FrameSource + 'static> BroadcastLoop<S> {
    pub fn new(config: &AppConfig, source: S, registry: SubscriberRegistry) -> Self {
        Self {
            source,
            session: TrackingSession::new(config),
            registry,
            settings: config.broadcast,
            stop: StopHandle::new(),
        }
    }

    /// Handle that ends the loop. A pending acquisition or pause is
    /// abandoned immediately; a frame already being processed completes.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn registry(&self) -> &SubscriberRegistry {
        &self.registry
    }

    pub async fn run(self) -> Result<LoopSummary> {
        let Self {
            source,
            mut session,
            registry,
            settings,
            stop,
        } = self;
        let Acquisition {
            requests,
            mut frames,
            released,
        } = Acquisition::spawn(source)?;
        let mut summary = LoopSummary::default();
        let clock = Instant::now();

        tracing::info!(
            interval_ms = settings.frame_interval_ms,
            "broadcast loop started"
        );

        while stop.is_running() {
            if requests.send(()).is_err() {
                tracing::warn!("acquisition thread exited unexpectedly");
                break;
            }
            let acquired = tokio::select! {
                acquired = frames.recv() => acquired,
                _ = stop.stopped() => break,
            };

            let frame = match acquired {
                Some(Ok(Some(frame))) => frame,
                Some(Ok(None)) => {
                    tracing::info!("frame source exhausted");
                    break;
                }
                Some(Err(err)) => {
                    summary.acquisition_failures += 1;
                    tracing::warn!(error = %err, "frame acquisition failed, retrying");
                    tokio::select! {
                        _ = tokio::time::sleep(settings.retry_delay()) => {}
                        _ = stop.stopped() => {}
                    }
                    continue;
                }
                None => {
                    tracing::warn!("acquisition thread exited unexpectedly");
                    break;
                }
            };

            let output = session.step(&frame, clock.elapsed().as_secs_f64());
            summary.frames += 1;
            if output.detected {
                summary.detected_frames += 1;
            }

            match fan_out(&registry, &output) {
                Ok(Some(report)) => {
                    summary.deliveries += report.delivered as u64;
                    summary.skipped_deliveries += report.skipped as u64;
                }
                Ok(None) => {}
                Err(err) => {
                    summary.failed_fanouts += 1;
                    tracing::warn!(error = %err, "fan-out skipped for this frame");
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(settings.frame_interval()) => {}
                _ = stop.stopped() => {}
            }
        }

        drop(requests);
        drop(frames);
        if tokio::time::timeout(settings.release_timeout(), released)
            .await
            .is_err()
        {
            tracing::warn!(
                timeout_ms = settings.release_timeout_ms,
                "capture source busy in a read, release deferred until it returns"
            );
        }

        tracing::info!(
            frames = summary.frames,
            detected = summary.detected_frames,
            failures = summary.acquisition_failures,
            delivered = summary.deliveries,
            skipped = summary.skipped_deliveries,
            failed_fanouts = summary.failed_fanouts,
            "broadcast loop stopped"
        );
        Ok(summary)
    }
}

/// Serialises `output` and offers it to every subscriber. `Ok(None)` means
/// nobody was registered and serialisation was skipped.
fn fan_out(
    registry: &SubscriberRegistry,
    output: &FrameOutput,
) -> Result<Option<DeliveryReport>> {
    if registry.is_empty()? {
        return Ok(None);
    }
    let message: Arc<str> = Arc::from(output.to_json()?);
    registry.broadcast(&message).map(Some)
}
