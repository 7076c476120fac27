use std::{
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};

use shared::{
    cards::CardCatalog,
    domain::{GameMode, MatchRecord, RunId},
};
use state_core::{
    projection::ProjectionPipeline, views, ProjectionBuilder, SnapshotSource,
    SnapshotSubscription, StoreSnapshot,
};
use tokio::{sync::watch, task::JoinHandle};
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, error, info};

use crate::{
    config::RunBoundaryConfig,
    detector::{BoundaryReason, DetectorInputs, RunBoundaryDetector, RunDecision},
};

/// Detector inputs as a projection. Silent until live counters exist, and
/// never debounced.
pub fn detector_inputs() -> ProjectionBuilder<DetectorInputs> {
    ProjectionBuilder::new("run_detector_inputs", |snapshot: &StoreSnapshot| {
        let live = snapshot.state.duels.live_info.clone()?;
        let last_match = snapshot
            .state
            .stats
            .latest_of(GameMode::is_duels)
            .cloned();
        let current_run = last_match.as_ref().and_then(|game| {
            snapshot
                .state
                .duels
                .run_containing(&game.review_id)
                .cloned()
        });
        Some(DetectorInputs {
            last_match,
            live: Some(live),
            current_run,
        })
    })
}

/// Publishes the current run id, re-deciding on every relevant snapshot.
/// Reads the store's ordered feed, so no snapshot is skipped.
pub struct RunIdService {
    run_id: watch::Receiver<RunId>,
    latest_match: watch::Receiver<Option<MatchRecord>>,
    seen: watch::Receiver<u64>,
    task: JoinHandle<()>,
}

impl RunIdService {
    pub fn spawn(
        source: &dyn SnapshotSource,
        config: RunBoundaryConfig,
        catalog: Arc<dyn CardCatalog>,
    ) -> Self {
        let detector = RunBoundaryDetector::new(config, catalog);
        let (run_id_tx, run_id) = watch::channel(detector.current_run_id());
        let (latest_match_tx, latest_match) = watch::channel(None);
        let (seen_tx, seen) = watch::channel(0);
        info!(run_id = %detector.current_run_id(), "initial run id");

        let worker = RunIdWorker {
            detector,
            inputs: detector_inputs().pipeline(),
            latest_match: views::latest_duels_match().pipeline(),
            run_id_tx,
            latest_match_tx,
            seen_tx,
        };
        let task = tokio::spawn(worker.run(source.subscribe_ordered()));

        Self {
            run_id,
            latest_match,
            seen,
            task,
        }
    }

    pub fn current(&self) -> RunId {
        *self.run_id.borrow()
    }

    pub fn latest_match(&self) -> Option<MatchRecord> {
        self.latest_match.borrow().clone()
    }

    /// Receiver that only wakes when the run id actually changes.
    pub fn subscribe(&self) -> watch::Receiver<RunId> {
        self.run_id.clone()
    }

    /// The current id followed by every later change.
    pub fn stream(&self) -> WatchStream<RunId> {
        WatchStream::new(self.run_id.clone())
    }

    /// Waits until the snapshot for ticket `seq` has been evaluated and
    /// returns the run id as of that point. `None` if the store went away
    /// first.
    pub async fn settled(&self, seq: u64) -> Option<RunId> {
        let mut seen = self.seen.clone();
        seen.wait_for(|observed| *observed >= seq).await.ok()?;
        Some(self.current())
    }

    pub fn stop(self) {
        self.task.abort();
    }
}

impl Drop for RunIdService {
    fn drop(&mut self) {
        self.task.abort();
    }
}

struct RunIdWorker {
    detector: RunBoundaryDetector,
    inputs: ProjectionPipeline<DetectorInputs>,
    latest_match: ProjectionPipeline<MatchRecord>,
    run_id_tx: watch::Sender<RunId>,
    latest_match_tx: watch::Sender<Option<MatchRecord>>,
    seen_tx: watch::Sender<u64>,
}

impl RunIdWorker {
    async fn run(mut self, mut snapshots: SnapshotSubscription) {
        while let Some(snapshot) = snapshots.recv().await {
            if let Some(game) = self.latest_match.offer(&snapshot) {
                debug!(review_id = %game.review_id, "latest duels match");
                self.latest_match_tx.send_replace(Some(game));
            }
            if let Some(inputs) = self.inputs.offer(&snapshot) {
                let decision = self.evaluate(snapshot.seq, inputs);
                self.publish(snapshot.seq, decision);
            }
            self.seen_tx.send_replace(snapshot.seq);
        }
        debug!("run id service stopped");
    }

    /// A panicking evaluation splits the run instead of taking the worker
    /// down with it.
    fn evaluate(&mut self, seq: u64, inputs: DetectorInputs) -> RunDecision {
        let detector = &mut self.detector;
        match panic::catch_unwind(AssertUnwindSafe(|| detector.evaluate(inputs))) {
            Ok(decision) => decision,
            Err(_) => {
                error!(seq, "run boundary evaluation panicked");
                self.detector.start_new_run(BoundaryReason::EvaluationFailed)
            }
        }
    }

    fn publish(&self, seq: u64, decision: RunDecision) {
        match decision {
            RunDecision::NewRun { run_id, reason } => {
                info!(seq, %run_id, %reason, "starting new run");
            }
            RunDecision::Continue { run_id, reason } => {
                debug!(seq, %run_id, %reason, "continuing run");
            }
        }
        let run_id = decision.run_id();
        self.run_id_tx.send_if_modified(|current| {
            if *current == run_id {
                return false;
            }
            *current = run_id;
            true
        });
    }
}
