use async_trait::async_trait;
use shared::{
    events::{EventKind, StoreEvent},
    state::{ApplicationState, BattlegroundsState, BgsGame, DuelsState, MercenariesState, NavigationState},
};
use tracing::{debug, warn};

use crate::{
    error::ProcessorError,
    history::StateHistory,
    registry::{unexpected_event, Processor, ProcessorOutput},
};

/// Keeps the latest live duels counters reported by the game session.
pub struct DuelsInfoProcessor;

#[async_trait]
impl Processor for DuelsInfoProcessor {
    async fn process(
        &self,
        event: &StoreEvent,
        state: &ApplicationState,
        _history: &StateHistory,
        _navigation: &NavigationState,
    ) -> Result<ProcessorOutput, ProcessorError> {
        let StoreEvent::DuelsInfoUpdated { info } = event else {
            return Err(unexpected_event(event, EventKind::DuelsInfoUpdated));
        };
        if state.duels.live_info.as_ref() == Some(info) {
            return Ok(ProcessorOutput::unchanged());
        }
        debug!(wins = info.wins, losses = info.losses, rating = info.rating, "duels info");
        Ok(ProcessorOutput::state(state.with_duels(DuelsState {
            runs: state.duels.runs.clone(),
            live_info: Some(info.clone()),
        })))
    }
}

pub struct BattlegroundsProcessor;

#[async_trait]
impl Processor for BattlegroundsProcessor {
    async fn process(
        &self,
        event: &StoreEvent,
        state: &ApplicationState,
        _history: &StateHistory,
        _navigation: &NavigationState,
    ) -> Result<ProcessorOutput, ProcessorError> {
        let current = state.battlegrounds.current_game.as_ref();
        let next = match event {
            StoreEvent::BgsGameStarted {
                hero_card_id,
                mmr_at_start,
            } => BgsGame {
                hero_card_id: hero_card_id.clone(),
                mmr_at_start: *mmr_at_start,
                face_offs: Vec::new(),
                game_ended: false,
            },
            StoreEvent::BgsFaceOffRecorded { face_off } => {
                let Some(game) = current.filter(|game| !game.game_ended) else {
                    warn!(turn = face_off.turn, "face-off outside a battlegrounds game, ignored");
                    return Ok(ProcessorOutput::unchanged());
                };
                let mut game = game.clone();
                game.face_offs.push(face_off.clone());
                game
            }
            StoreEvent::BgsGameEnded => {
                let Some(game) = current.filter(|game| !game.game_ended) else {
                    return Ok(ProcessorOutput::unchanged());
                };
                BgsGame {
                    game_ended: true,
                    ..game.clone()
                }
            }
            other => return Err(unexpected_event(other, EventKind::BgsGameStarted)),
        };

        Ok(ProcessorOutput::state(state.with_battlegrounds(
            BattlegroundsState {
                current_game: Some(next),
            },
        )))
    }
}

pub struct MercenariesTeamProcessor;

#[async_trait]
impl Processor for MercenariesTeamProcessor {
    async fn process(
        &self,
        event: &StoreEvent,
        state: &ApplicationState,
        _history: &StateHistory,
        _navigation: &NavigationState,
    ) -> Result<ProcessorOutput, ProcessorError> {
        let StoreEvent::MercenariesTeamUpdated {
            game_mode,
            team,
            levels,
        } = event
        else {
            return Err(unexpected_event(event, EventKind::MercenariesTeamUpdated));
        };
        if !game_mode.is_mercenaries() {
            return Err(ProcessorError::InvalidPayload(format!(
                "{game_mode:?} is not a mercenaries mode"
            )));
        }

        let mut merged = state.mercenaries.levels.clone();
        for (card_id, level) in levels {
            let entry = merged.entry(card_id.clone()).or_insert(*level);
            // levels never go down
            *entry = (*entry).max(*level);
        }

        Ok(ProcessorOutput::state(state.with_mercenaries(
            MercenariesState {
                game_mode: Some(*game_mode),
                team: team.clone(),
                levels: merged,
            },
        )))
    }
}
