//! Decides which run the most recent duels match belongs to.
//!
//! The detector is a plain value: it holds the last inputs it saw and the run
//! id it settled on, and [`RunBoundaryDetector::evaluate`] is synchronous. The
//! service in [`crate::service`] feeds it from store snapshots.
//!
//! Decisions, first match wins:
//!
//! 1. no duels match yet: new run
//! 2. the match's own tally says the run goes on, and the live counters do
//!    not contradict it: keep the match's run id
//! 3. otherwise compare the live session counters with the tracked run; any
//!    sign of a different run, or no usable evidence at all, starts a new run
//!
//! A tie played at 0-0 never opens a run on its own.

use std::{fmt, sync::Arc};

use serde::Serialize;
use shared::{
    cards::CardCatalog,
    domain::{LiveSessionCounters, MatchRecord, MatchResult, RunId, RunRecord, RunTally},
};

use crate::config::RunBoundaryConfig;

/// The slice of application state the detector looks at.
#[derive(Debug, Clone, Default)]
pub struct DetectorInputs {
    pub last_match: Option<MatchRecord>,
    pub live: Option<LiveSessionCounters>,
    pub current_run: Option<RunRecord>,
}

impl PartialEq for DetectorInputs {
    fn eq(&self, other: &Self) -> bool {
        let same_live = match (&self.live, &other.live) {
            (Some(a), Some(b)) => a.same_run_characteristics(b),
            (None, None) => true,
            _ => false,
        };
        same_live && self.last_match == other.last_match && self.current_run == other.current_run
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContinuationReason {
    TallyBelowThreshold,
    OpeningTie,
    UnchangedInputs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryReason {
    NoPreviousMatch,
    NoLiveCounters,
    FreshSession,
    NoTrackedRun,
    CountersDecreased,
    HeroPowerChanged,
    RatingChanged,
    SignatureChanged,
    Ambiguous,
    EvaluationFailed,
}

impl fmt::Display for ContinuationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ContinuationReason::TallyBelowThreshold => "match tally below run end thresholds",
            ContinuationReason::OpeningTie => "tie before any win or loss",
            ContinuationReason::UnchangedInputs => "inputs unchanged",
        };
        f.write_str(text)
    }
}

impl fmt::Display for BoundaryReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            BoundaryReason::NoPreviousMatch => "no previous duels match",
            BoundaryReason::NoLiveCounters => "no live session counters",
            BoundaryReason::FreshSession => "live wins and losses are 0",
            BoundaryReason::NoTrackedRun => "no run tracked for the last match",
            BoundaryReason::CountersDecreased => "wins or losses went down",
            BoundaryReason::HeroPowerChanged => "different starting hero power",
            BoundaryReason::RatingChanged => "rating changed",
            BoundaryReason::SignatureChanged => "different signature treasure",
            BoundaryReason::Ambiguous => "no evidence of continuation",
            BoundaryReason::EvaluationFailed => "evaluation failed",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum RunDecision {
    Continue {
        run_id: RunId,
        reason: ContinuationReason,
    },
    NewRun {
        run_id: RunId,
        reason: BoundaryReason,
    },
}

impl RunDecision {
    pub fn run_id(&self) -> RunId {
        match self {
            RunDecision::Continue { run_id, .. } | RunDecision::NewRun { run_id, .. } => *run_id,
        }
    }

    pub fn is_new_run(&self) -> bool {
        matches!(self, RunDecision::NewRun { .. })
    }
}

pub struct RunBoundaryDetector {
    config: RunBoundaryConfig,
    catalog: Arc<dyn CardCatalog>,
    current_run_id: RunId,
    last_inputs: Option<DetectorInputs>,
}

impl RunBoundaryDetector {
    /// Starts with a freshly generated run id, the answer before any
    /// telemetry has arrived.
    pub fn new(config: RunBoundaryConfig, catalog: Arc<dyn CardCatalog>) -> Self {
        Self {
            config,
            catalog,
            current_run_id: RunId::generate(),
            last_inputs: None,
        }
    }

    pub fn current_run_id(&self) -> RunId {
        self.current_run_id
    }

    pub fn evaluate(&mut self, inputs: DetectorInputs) -> RunDecision {
        if self.last_inputs.as_ref() == Some(&inputs) {
            return RunDecision::Continue {
                run_id: self.current_run_id,
                reason: ContinuationReason::UnchangedInputs,
            };
        }

        let decision = self.decide(&inputs);
        self.current_run_id = decision.run_id();
        self.last_inputs = Some(inputs);
        decision
    }

    /// Abandons the current run without looking at any inputs. The next
    /// `evaluate` decides from scratch.
    pub fn start_new_run(&mut self, reason: BoundaryReason) -> RunDecision {
        let decision = new_run(reason);
        self.current_run_id = decision.run_id();
        self.last_inputs = None;
        decision
    }

    fn decide(&self, inputs: &DetectorInputs) -> RunDecision {
        let Some(game) = &inputs.last_match else {
            return new_run(BoundaryReason::NoPreviousMatch);
        };

        if let Some(tally) = game.additional_result {
            let contradicted = inputs
                .live
                .as_ref()
                .is_some_and(|live| below(live.tally(), tally));
            if !self.config.is_terminal(tally, game.result) && !contradicted {
                return RunDecision::Continue {
                    run_id: game.run_id.unwrap_or(self.current_run_id),
                    reason: ContinuationReason::TallyBelowThreshold,
                };
            }
        }

        match self.boundary(game, inputs) {
            Ok(reason) => RunDecision::Continue {
                run_id: game.run_id.unwrap_or(self.current_run_id),
                reason,
            },
            Err(reason) => new_run(reason),
        }
    }

    /// Live-counter evaluation. `Err` carries the reason a new run starts.
    fn boundary(
        &self,
        game: &MatchRecord,
        inputs: &DetectorInputs,
    ) -> Result<ContinuationReason, BoundaryReason> {
        let live = inputs.live.as_ref().ok_or(BoundaryReason::NoLiveCounters)?;
        let entering = game.additional_result.unwrap_or_default();

        if live.tally().is_zero() {
            if game.result == MatchResult::Tied && entering.is_zero() {
                return Ok(ContinuationReason::OpeningTie);
            }
            return Err(BoundaryReason::FreshSession);
        }

        if below(live.tally(), entering) {
            return Err(BoundaryReason::CountersDecreased);
        }

        let run = inputs
            .current_run
            .as_ref()
            .ok_or(BoundaryReason::NoTrackedRun)?;
        if below(live.tally(), run.tally()) {
            return Err(BoundaryReason::CountersDecreased);
        }
        if run.hero_power_card_id != live.starting_hero_power {
            return Err(BoundaryReason::HeroPowerChanged);
        }
        if live.last_rating_change > 0
            || run
                .rating_at_start
                .is_some_and(|rating| rating != live.rating)
        {
            return Err(BoundaryReason::RatingChanged);
        }
        if self.catalog.find_signature_treasure(&live.deck_list) != run.signature_treasure_card_id
        {
            return Err(BoundaryReason::SignatureChanged);
        }

        Err(BoundaryReason::Ambiguous)
    }
}

fn new_run(reason: BoundaryReason) -> RunDecision {
    RunDecision::NewRun {
        run_id: RunId::generate(),
        reason,
    }
}

/// True when either counter of `current` is behind `reference`.
fn below(current: RunTally, reference: RunTally) -> bool {
    current.wins < reference.wins || current.losses < reference.losses
}
