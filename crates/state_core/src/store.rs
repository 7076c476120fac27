use std::{
    any::Any,
    panic::AssertUnwindSafe,
    sync::{Arc, Mutex, MutexGuard},
};

use futures::FutureExt;
use shared::{
    error::ErrorCode,
    events::{EventKind, StoreEvent},
    state::{ApplicationState, NavigationState},
};
use tokio::{
    sync::{broadcast, mpsc, watch},
    task::JoinHandle,
};
use tracing::{debug, error, info, warn};

use crate::{
    error::ProcessingFailure,
    history::{HistoryEntry, StateHistory},
    registry::ProcessorRegistry,
};

const DEFAULT_HISTORY_CAPACITY: usize = 20;
const DEFAULT_PUBLISH_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
    pub history_capacity: usize,
    pub publish_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            publish_capacity: DEFAULT_PUBLISH_CAPACITY,
        }
    }
}

/// The published `(ApplicationState, NavigationState)` pair. `seq` is the
/// ticket of the last event the store handled, 0 before any event.
#[derive(Debug, Clone)]
pub struct StoreSnapshot {
    pub seq: u64,
    pub state: Arc<ApplicationState>,
    pub navigation: Arc<NavigationState>,
}

/// Read-only access to published snapshots.
pub trait SnapshotSource: Send + Sync {
    fn latest(&self) -> StoreSnapshot;

    /// Bounded feed. A subscriber that falls more than the publish capacity
    /// behind skips ahead to the latest snapshot.
    fn subscribe(&self) -> SnapshotSubscription;

    /// Unbounded feed that yields every snapshot, however far behind the
    /// subscriber is.
    fn subscribe_ordered(&self) -> SnapshotSubscription;
}

enum Updates {
    Bounded {
        updates: broadcast::Receiver<StoreSnapshot>,
        latest: watch::Receiver<StoreSnapshot>,
    },
    Ordered(mpsc::UnboundedReceiver<StoreSnapshot>),
}

/// Replay-latest subscription: the first `recv` yields the snapshot current
/// at subscribe time, later calls yield publications after it in order.
pub struct SnapshotSubscription {
    pending: Option<StoreSnapshot>,
    last_seq: Option<u64>,
    updates: Updates,
}

impl SnapshotSubscription {
    fn bounded(
        updates: broadcast::Receiver<StoreSnapshot>,
        latest: watch::Receiver<StoreSnapshot>,
    ) -> Self {
        let current = latest.borrow().clone();
        Self {
            pending: Some(current),
            last_seq: None,
            updates: Updates::Bounded { updates, latest },
        }
    }

    fn ordered(current: StoreSnapshot, updates: mpsc::UnboundedReceiver<StoreSnapshot>) -> Self {
        Self {
            pending: Some(current),
            last_seq: None,
            updates: Updates::Ordered(updates),
        }
    }

    pub async fn recv(&mut self) -> Option<StoreSnapshot> {
        if let Some(snapshot) = self.pending.take() {
            self.last_seq = Some(snapshot.seq);
            return Some(snapshot);
        }

        loop {
            let snapshot = match &mut self.updates {
                Updates::Ordered(updates) => updates.recv().await?,
                Updates::Bounded { updates, latest } => match updates.recv().await {
                    Ok(snapshot) => snapshot,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "snapshot subscriber lagged, jumping to latest");
                        latest.borrow().clone()
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                },
            };
            if self.is_stale(snapshot.seq) {
                continue;
            }
            self.last_seq = Some(snapshot.seq);
            return Some(snapshot);
        }
    }

    fn is_stale(&self, seq: u64) -> bool {
        self.last_seq.is_some_and(|last| seq <= last)
    }
}

/// Senders for [`SnapshotSource::subscribe_ordered`]. Closed once the apply
/// task exits.
#[derive(Default)]
struct OrderedFeeds {
    closed: bool,
    senders: Vec<mpsc::UnboundedSender<StoreSnapshot>>,
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

struct QueuedEvent {
    seq: u64,
    event: StoreEvent,
}

struct SubmitQueue {
    sender: Option<mpsc::UnboundedSender<QueuedEvent>>,
    next_seq: u64,
}

/// Single owner of the application snapshot. Events are applied one at a
/// time, in submission order, by a background task.
pub struct StateStore {
    queue: Mutex<SubmitQueue>,
    publisher: broadcast::Sender<StoreSnapshot>,
    latest: watch::Receiver<StoreSnapshot>,
    ordered: Arc<Mutex<OrderedFeeds>>,
    failures: broadcast::Sender<ProcessingFailure>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl StateStore {
    pub fn new(registry: ProcessorRegistry) -> Arc<Self> {
        Self::new_with_state(
            registry,
            ApplicationState::default(),
            NavigationState::default(),
            StoreConfig::default(),
        )
    }

    /// Spawns the apply task on the current tokio runtime.
    pub fn new_with_state(
        registry: ProcessorRegistry,
        state: ApplicationState,
        navigation: NavigationState,
        config: StoreConfig,
    ) -> Arc<Self> {
        let initial = StoreSnapshot {
            seq: 0,
            state: Arc::new(state),
            navigation: Arc::new(navigation),
        };
        let (publisher, _) = broadcast::channel(config.publish_capacity.max(1));
        let (failures, _) = broadcast::channel(config.publish_capacity.max(1));
        let (latest_tx, latest) = watch::channel(initial.clone());
        let (sender, receiver) = mpsc::unbounded_channel();
        let ordered = Arc::new(Mutex::new(OrderedFeeds::default()));
        debug!(kinds = ?registry.kinds(), "processor kinds");
        let registry_len = registry.len();

        let worker = StoreWorker {
            registry,
            state: initial.state,
            navigation: initial.navigation,
            history: StateHistory::new(config.history_capacity),
            publisher: publisher.clone(),
            latest: latest_tx,
            ordered: Arc::clone(&ordered),
            failures: failures.clone(),
        };
        let handle = tokio::spawn(worker.run(receiver));
        info!(
            processors = registry_len,
            history_capacity = config.history_capacity,
            publish_capacity = config.publish_capacity,
            "state store started"
        );

        Arc::new(Self {
            queue: Mutex::new(SubmitQueue {
                sender: Some(sender),
                next_seq: 0,
            }),
            publisher,
            latest,
            ordered,
            failures,
            worker: Mutex::new(Some(handle)),
        })
    }

    /// Queues `event` and returns its ticket. Completion shows up as a
    /// published snapshot whose `seq` is at least the ticket.
    pub fn submit(&self, event: StoreEvent) -> u64 {
        let mut queue = lock(&self.queue);
        queue.next_seq += 1;
        let seq = queue.next_seq;
        let kind = event.kind();
        match &queue.sender {
            Some(sender) => {
                if sender.send(QueuedEvent { seq, event }).is_err() {
                    warn!(seq, %kind, "state store worker is gone, dropping event");
                }
            }
            None => warn!(seq, %kind, "state store is shut down, dropping event"),
        }
        seq
    }

    pub fn subscribe_failures(&self) -> broadcast::Receiver<ProcessingFailure> {
        self.failures.subscribe()
    }

    /// Resolves once the snapshot for ticket `seq` (or a later one) has been
    /// published. `None` if the store stopped first.
    pub async fn wait_for(&self, seq: u64) -> Option<StoreSnapshot> {
        let mut latest = self.latest.clone();
        let snapshot = latest
            .wait_for(|snapshot| snapshot.seq >= seq)
            .await
            .ok()
            .map(|snapshot| snapshot.clone());
        snapshot
    }

    /// Stops accepting events, lets queued ones finish, and waits for the
    /// apply task to exit.
    pub async fn shutdown(&self) {
        lock(&self.queue).sender.take();
        let handle = lock(&self.worker).take();
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                error!("state store worker ended abnormally: {err}");
            }
        }
    }
}

impl SnapshotSource for StateStore {
    fn latest(&self) -> StoreSnapshot {
        self.latest.borrow().clone()
    }

    fn subscribe(&self) -> SnapshotSubscription {
        // subscribe before reading the latest value so nothing falls in between
        let updates = self.publisher.subscribe();
        SnapshotSubscription::bounded(updates, self.latest.clone())
    }

    fn subscribe_ordered(&self) -> SnapshotSubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        // the worker publishes under this lock, so `current` and the feed line up
        let mut feeds = lock(&self.ordered);
        let current = self.latest.borrow().clone();
        if !feeds.closed {
            feeds.senders.push(tx);
        }
        SnapshotSubscription::ordered(current, rx)
    }
}

struct StoreWorker {
    registry: ProcessorRegistry,
    state: Arc<ApplicationState>,
    navigation: Arc<NavigationState>,
    history: StateHistory,
    publisher: broadcast::Sender<StoreSnapshot>,
    latest: watch::Sender<StoreSnapshot>,
    ordered: Arc<Mutex<OrderedFeeds>>,
    failures: broadcast::Sender<ProcessingFailure>,
}

impl StoreWorker {
    async fn run(mut self, mut queue: mpsc::UnboundedReceiver<QueuedEvent>) {
        while let Some(queued) = queue.recv().await {
            self.apply(queued).await;
        }
        {
            let mut feeds = lock(&self.ordered);
            feeds.closed = true;
            feeds.senders.clear();
        }
        debug!("state store queue closed");
    }

    async fn apply(&mut self, queued: QueuedEvent) {
        let QueuedEvent { seq, event } = queued;
        let kind = event.kind();

        let Some(processor) = self.registry.resolve(kind) else {
            warn!(seq, %kind, "no processor registered, event ignored");
            self.publish(seq);
            return;
        };

        let outcome = AssertUnwindSafe(processor.process(
            &event,
            &self.state,
            &self.history,
            &self.navigation,
        ))
        .catch_unwind()
        .await;

        match outcome {
            Ok(Ok(output)) => {
                let changed = !output.is_unchanged();
                if let Some(state) = output.state {
                    self.state = Arc::new(state);
                    self.history.push(HistoryEntry {
                        seq,
                        kind,
                        state: Arc::clone(&self.state),
                    });
                }
                if let Some(navigation) = output.navigation {
                    self.navigation = Arc::new(navigation);
                }
                debug!(seq, %kind, changed, "event applied");
            }
            Ok(Err(err)) => self.report_failure(seq, kind, err.code(), err.to_string()),
            Err(panic) => self.report_failure(
                seq,
                kind,
                ErrorCode::Panicked,
                panic_message(panic.as_ref()),
            ),
        }

        self.publish(seq);
    }

    fn report_failure(&self, seq: u64, kind: EventKind, code: ErrorCode, message: String) {
        error!(seq, %kind, ?code, "processor failed, keeping previous state: {message}");
        let _ = self.failures.send(ProcessingFailure {
            seq,
            kind,
            code,
            message,
        });
    }

    fn publish(&self, seq: u64) {
        let snapshot = StoreSnapshot {
            seq,
            state: Arc::clone(&self.state),
            navigation: Arc::clone(&self.navigation),
        };
        {
            let mut feeds = lock(&self.ordered);
            self.latest.send_replace(snapshot.clone());
            feeds
                .senders
                .retain(|feed| feed.send(snapshot.clone()).is_ok());
        }
        // no receivers is fine; the watch still holds the latest value
        let _ = self.publisher.send(snapshot);
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "processor panicked".to_string()
    }
}
