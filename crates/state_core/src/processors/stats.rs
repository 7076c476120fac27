use std::sync::Arc;

use async_trait::async_trait;
use shared::{
    cards::CardCatalog,
    domain::{LiveSessionCounters, MatchRecord, RunId, RunRecord},
    events::{EventKind, StoreEvent},
    preferences::Preferences,
    state::{ApplicationState, DeckStats, DecktrackerState, DuelsState, NavigationState, StatsState},
};
use storage::PreferencesStore;
use tracing::{debug, info};

use crate::{
    error::ProcessorError,
    history::StateHistory,
    registry::{unexpected_event, Processor, ProcessorOutput},
};

/// Records a finished match and rebuilds everything derived from the match
/// list.
pub struct RecomputeGameStatsProcessor {
    prefs: Arc<dyn PreferencesStore>,
    catalog: Arc<dyn CardCatalog>,
}

impl RecomputeGameStatsProcessor {
    pub fn new(prefs: Arc<dyn PreferencesStore>, catalog: Arc<dyn CardCatalog>) -> Self {
        Self { prefs, catalog }
    }
}

#[async_trait]
impl Processor for RecomputeGameStatsProcessor {
    async fn process(
        &self,
        event: &StoreEvent,
        state: &ApplicationState,
        _history: &StateHistory,
        _navigation: &NavigationState,
    ) -> Result<ProcessorOutput, ProcessorError> {
        let StoreEvent::RecomputeGameStats { game_stat } = event else {
            return Err(unexpected_event(event, EventKind::RecomputeGameStats));
        };

        if state.stats.contains(&game_stat.review_id) {
            debug!(review_id = %game_stat.review_id, "match already recorded");
            return Ok(ProcessorOutput::unchanged());
        }

        let mut game_stats = Vec::with_capacity(state.stats.game_stats.len() + 1);
        game_stats.push(game_stat.clone());
        game_stats.extend(state.stats.game_stats.iter().cloned());
        let stats = StatsState { game_stats };

        let prefs = self.prefs.get().await.map_err(ProcessorError::Preferences)?;
        let decktracker = DecktrackerState {
            deckbuilder: state.decktracker.deckbuilder.clone(),
            decks: build_deck_stats(&prefs, &stats),
        };
        let duels = update_runs(&state.duels, game_stat, self.catalog.as_ref());

        info!(
            review_id = %game_stat.review_id,
            mode = ?game_stat.game_mode,
            result = ?game_stat.result,
            total = stats.game_stats.len(),
            "recorded match"
        );
        Ok(ProcessorOutput::state(ApplicationState {
            stats,
            decktracker,
            duels,
            ..state.clone()
        }))
    }
}

fn build_deck_stats(prefs: &Preferences, stats: &StatsState) -> Vec<DeckStats> {
    prefs
        .constructed_personal_additional_decks
        .iter()
        .map(|deck| {
            let mut summary =
                DeckStats::empty(deck.deckstring.clone(), Some(deck.deck_name.clone()));
            stats
                .game_stats
                .iter()
                .filter(|game| game.player_decklist.as_ref() == Some(&deck.deckstring))
                .for_each(|game| summary.record(game));
            summary
        })
        .collect()
}

fn update_runs(duels: &DuelsState, game: &MatchRecord, catalog: &dyn CardCatalog) -> DuelsState {
    let Some(run_id) = game.run_id.filter(|_| game.game_mode.is_duels()) else {
        return duels.clone();
    };

    let mut runs = duels.runs.clone();
    match runs.iter().position(|run| run.id == run_id) {
        Some(index) => runs[index] = runs[index].extended_with(game),
        None => {
            let run = new_run(run_id, duels.live_info.as_ref(), catalog).extended_with(game);
            debug!(%run_id, "tracking new run");
            // newest first, like the match list
            runs.insert(0, run);
        }
    }

    DuelsState {
        runs,
        live_info: duels.live_info.clone(),
    }
}

fn new_run(
    run_id: RunId,
    live: Option<&LiveSessionCounters>,
    catalog: &dyn CardCatalog,
) -> RunRecord {
    let mut run = RunRecord::start(run_id);
    if let Some(live) = live {
        run.hero_card_id = live.hero_card_id.clone();
        run.hero_power_card_id = live.starting_hero_power.clone();
        run.signature_treasure_card_id = catalog.find_signature_treasure(&live.deck_list);
        run.rating_at_start = Some(live.rating);
    }
    run
}
