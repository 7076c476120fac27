//! Derived values computed from published snapshots.
//!
//! A projection is built from four steps, in order:
//!
//! 1. a selector that pulls a narrow slice out of the snapshot, returning
//!    `None` when the inputs it needs are absent,
//! 2. an optional filter on the selected slice,
//! 3. a structural comparison against the previously accepted slice, so a
//!    snapshot rebuilt with identical contents does not re-trigger anything,
//! 4. an optional debounce window; only the last value of a burst is
//!    forwarded once the window elapses without a newer one.
//!
//! Each spawned projection runs in its own task and handles snapshots one at
//! a time. Dropping or cancelling the subscription aborts the task, pending
//! debounce timers included. For callback projections, cancellation waits for
//! a callback already in progress, and no callback starts after it returns.

use std::{
    pin::Pin,
    sync::{Arc, Mutex},
    task::{Context, Poll},
    time::Duration,
};

use futures::Stream;
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{sleep_until, Instant},
};
use tracing::{debug, trace};

use crate::store::{lock, SnapshotSource, SnapshotSubscription, StoreSnapshot};

type Selector<T> = Arc<dyn Fn(&StoreSnapshot) -> Option<T> + Send + Sync>;
type Predicate<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;
type Comparator<T> = Arc<dyn Fn(&T, &T) -> bool + Send + Sync>;

pub struct ProjectionBuilder<T> {
    name: &'static str,
    select: Selector<T>,
    filters: Vec<Predicate<T>>,
    same: Comparator<T>,
    debounce: Option<Duration>,
}

impl<T> ProjectionBuilder<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    pub fn new(
        name: &'static str,
        select: impl Fn(&StoreSnapshot) -> Option<T> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name,
            select: Arc::new(select),
            filters: Vec::new(),
            same: Arc::new(|a: &T, b: &T| a == b),
            debounce: None,
        }
    }
}

impl<T> ProjectionBuilder<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn filter(mut self, predicate: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
        self.filters.push(Arc::new(predicate));
        self
    }

    /// Replaces the default `PartialEq` comparison, e.g. to ignore fields
    /// that change without mattering to this projection.
    pub fn distinct_by(mut self, same: impl Fn(&T, &T) -> bool + Send + Sync + 'static) -> Self {
        self.same = Arc::new(same);
        self
    }

    pub fn debounce(mut self, window: Duration) -> Self {
        self.debounce = Some(window);
        self
    }

    /// Synchronous pipeline without the debounce step.
    pub fn pipeline(&self) -> ProjectionPipeline<T> {
        ProjectionPipeline {
            select: Arc::clone(&self.select),
            filters: self.filters.clone(),
            same: Arc::clone(&self.same),
            last: None,
        }
    }

    pub fn subscribe(self, source: &dyn SnapshotSource) -> ProjectionSubscription<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = self.spawn_driver(source.subscribe(), move |value| tx.send(value).is_ok());
        ProjectionSubscription { rx, task }
    }

    /// Runs `callback` on the projection task for every forwarded value.
    /// The callback must not cancel its own handle.
    pub fn on_change(
        self,
        source: &dyn SnapshotSource,
        mut callback: impl FnMut(T) + Send + 'static,
    ) -> ProjectionHandle {
        let active = Arc::new(Mutex::new(true));
        let gate = Arc::clone(&active);
        let task = self.spawn_driver(source.subscribe(), move |value| {
            let active = lock(&gate);
            if !*active {
                return false;
            }
            callback(value);
            true
        });
        ProjectionHandle { active, task }
    }

    fn spawn_driver(
        self,
        snapshots: SnapshotSubscription,
        emit: impl FnMut(T) -> bool + Send + 'static,
    ) -> JoinHandle<()> {
        let driver = ProjectionDriver {
            name: self.name,
            pipeline: self.pipeline(),
            same: Arc::clone(&self.same),
            debounce: self.debounce,
            last_forwarded: None,
        };
        tokio::spawn(driver.run(snapshots, emit))
    }
}

/// Select, filter and dedup for one projection, usable without a runtime.
pub struct ProjectionPipeline<T> {
    select: Selector<T>,
    filters: Vec<Predicate<T>>,
    same: Comparator<T>,
    last: Option<T>,
}

impl<T: Clone> ProjectionPipeline<T> {
    /// Returns the slice of `snapshot` if it should propagate.
    pub fn offer(&mut self, snapshot: &StoreSnapshot) -> Option<T> {
        let value = (self.select)(snapshot)?;
        if !self.filters.iter().all(|keep| keep(&value)) {
            return None;
        }
        if let Some(last) = &self.last {
            if (self.same)(last, &value) {
                return None;
            }
        }
        self.last = Some(value.clone());
        Some(value)
    }
}

struct ProjectionDriver<T> {
    name: &'static str,
    pipeline: ProjectionPipeline<T>,
    same: Comparator<T>,
    debounce: Option<Duration>,
    last_forwarded: Option<T>,
}

enum Step<T> {
    Snapshot(Option<StoreSnapshot>),
    Flush(T),
}

impl<T: Clone + Send + 'static> ProjectionDriver<T> {
    async fn run(
        mut self,
        mut snapshots: SnapshotSubscription,
        mut emit: impl FnMut(T) -> bool + Send,
    ) {
        let mut pending: Option<(T, Instant)> = None;
        loop {
            let step = match pending.take() {
                Some((value, deadline)) => {
                    tokio::select! {
                        snapshot = snapshots.recv() => {
                            pending = Some((value, deadline));
                            Step::Snapshot(snapshot)
                        }
                        _ = sleep_until(deadline) => Step::Flush(value),
                    }
                }
                None => Step::Snapshot(snapshots.recv().await),
            };

            match step {
                Step::Snapshot(Some(snapshot)) => {
                    let Some(value) = self.pipeline.offer(&snapshot) else {
                        continue;
                    };
                    trace!(projection = self.name, seq = snapshot.seq, "slice changed");
                    match self.debounce {
                        Some(window) => pending = Some((value, Instant::now() + window)),
                        None => {
                            if !self.forward(value, &mut emit) {
                                break;
                            }
                        }
                    }
                }
                Step::Snapshot(None) => {
                    if let Some((value, _)) = pending.take() {
                        self.forward(value, &mut emit);
                    }
                    break;
                }
                Step::Flush(value) => {
                    if !self.forward(value, &mut emit) {
                        break;
                    }
                }
            }
        }
        debug!(projection = self.name, "projection stopped");
    }

    /// Returns false once the consumer is gone.
    fn forward(&mut self, value: T, emit: &mut impl FnMut(T) -> bool) -> bool {
        if let Some(last) = &self.last_forwarded {
            if (self.same)(last, &value) {
                return true;
            }
        }
        self.last_forwarded = Some(value.clone());
        emit(value)
    }
}

/// Stream of projected values. Dropping it stops the projection.
pub struct ProjectionSubscription<T> {
    rx: mpsc::UnboundedReceiver<T>,
    task: JoinHandle<()>,
}

impl<T> ProjectionSubscription<T> {
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Non-blocking read of an already forwarded value.
    pub fn try_recv(&mut self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    pub fn cancel(mut self) {
        self.task.abort();
        self.rx.close();
    }
}

impl<T> Drop for ProjectionSubscription<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl<T> Stream for ProjectionSubscription<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.rx.poll_recv(cx)
    }
}

/// Handle for a callback-driven projection. Dropping it stops the callbacks.
pub struct ProjectionHandle {
    active: Arc<Mutex<bool>>,
    task: JoinHandle<()>,
}

impl ProjectionHandle {
    /// Blocks while a callback is running.
    pub fn cancel(mut self) {
        self.stop();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    fn stop(&mut self) {
        *lock(&self.active) = false;
        self.task.abort();
    }
}

impl Drop for ProjectionHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
