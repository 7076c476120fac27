use std::io::BufRead;

use anyhow::{Context, Result};
use run_tracker::RunIdService;
use serde::Serialize;
use shared::{
    domain::{CardId, ReviewId, RunId, RunTally},
    events::StoreEvent,
    state::AppPanel,
};
use state_core::{ProcessingFailure, StateStore, StoreSnapshot};
use tracing::{debug, info};

/// Reads one event per line. Blank lines and lines starting with `#` are
/// skipped.
pub fn parse_events(reader: impl BufRead) -> Result<Vec<StoreEvent>> {
    let mut events = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("failed to read line {}", index + 1))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let event = serde_json::from_str(trimmed)
            .with_context(|| format!("invalid event on line {}", index + 1))?;
        events.push(event);
    }
    Ok(events)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunAssignment {
    pub review_id: ReviewId,
    pub run_id: RunId,
}

/// Submits `events` in order. Duels matches that arrive without a run id are
/// stamped with the run id current once every earlier event has been
/// evaluated.
pub async fn replay_events(
    store: &StateStore,
    runs: &RunIdService,
    events: Vec<StoreEvent>,
) -> Result<(u64, Vec<RunAssignment>)> {
    let mut last_seq = 0;
    let mut assignments = Vec::new();

    for event in events {
        let event = match event {
            StoreEvent::RecomputeGameStats { mut game_stat }
                if game_stat.game_mode.is_duels() && game_stat.run_id.is_none() =>
            {
                let run_id = runs
                    .settled(last_seq)
                    .await
                    .context("run tracking stopped before the replay finished")?;
                debug!(review_id = %game_stat.review_id, %run_id, "stamping duels match");
                assignments.push(RunAssignment {
                    review_id: game_stat.review_id.clone(),
                    run_id,
                });
                game_stat.run_id = Some(run_id);
                StoreEvent::RecomputeGameStats { game_stat }
            }
            other => other,
        };
        last_seq = store.submit(event);
    }

    info!(events = last_seq, assigned = assignments.len(), "replay submitted");
    Ok((last_seq, assignments))
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: RunId,
    pub hero_card_id: Option<CardId>,
    pub signature_treasure_card_id: Option<CardId>,
    pub record: RunTally,
    pub matches: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplaySummary {
    pub last_seq: u64,
    pub current_run_id: RunId,
    pub current_app: AppPanel,
    pub matches: usize,
    pub runs: Vec<RunSummary>,
    pub assignments: Vec<RunAssignment>,
    pub failures: Vec<ProcessingFailure>,
}

impl ReplaySummary {
    pub fn new(
        snapshot: &StoreSnapshot,
        current_run_id: RunId,
        assignments: Vec<RunAssignment>,
        failures: Vec<ProcessingFailure>,
    ) -> Self {
        let runs = snapshot
            .state
            .duels
            .runs
            .iter()
            .map(|run| RunSummary {
                run_id: run.id,
                hero_card_id: run.hero_card_id.clone(),
                signature_treasure_card_id: run.signature_treasure_card_id.clone(),
                record: run.tally(),
                matches: run.steps.len(),
            })
            .collect();

        Self {
            last_seq: snapshot.seq,
            current_run_id,
            current_app: snapshot.navigation.current_app,
            matches: snapshot.state.stats.game_stats.len(),
            runs,
            assignments,
            failures,
        }
    }
}

#[cfg(test)]
#[path = "tests/replay_tests.rs"]
mod tests;
