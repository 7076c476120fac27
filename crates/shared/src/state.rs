//! Application and navigation snapshots.
//!
//! Both types are plain values. The store replaces them wholesale on every
//! applied event, so nothing here offers in-place mutation helpers beyond the
//! `with_*` builders that return a new value.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    CardId, DeckString, GameFormat, GameMode, LiveSessionCounters, MatchRecord, MatchResult,
    ReviewId, RunRecord,
};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ApplicationState {
    pub stats: StatsState,
    pub decktracker: DecktrackerState,
    pub duels: DuelsState,
    pub battlegrounds: BattlegroundsState,
    pub mercenaries: MercenariesState,
}

impl ApplicationState {
    pub fn with_stats(&self, stats: StatsState) -> Self {
        Self {
            stats,
            ..self.clone()
        }
    }

    pub fn with_decktracker(&self, decktracker: DecktrackerState) -> Self {
        Self {
            decktracker,
            ..self.clone()
        }
    }

    pub fn with_duels(&self, duels: DuelsState) -> Self {
        Self {
            duels,
            ..self.clone()
        }
    }

    pub fn with_battlegrounds(&self, battlegrounds: BattlegroundsState) -> Self {
        Self {
            battlegrounds,
            ..self.clone()
        }
    }

    pub fn with_mercenaries(&self, mercenaries: MercenariesState) -> Self {
        Self {
            mercenaries,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatsState {
    /// Newest first.
    pub game_stats: Vec<MatchRecord>,
}

impl StatsState {
    pub fn latest_of(&self, predicate: impl Fn(GameMode) -> bool) -> Option<&MatchRecord> {
        self.game_stats.iter().find(|game| predicate(game.game_mode))
    }

    pub fn contains(&self, review_id: &ReviewId) -> bool {
        self.game_stats
            .iter()
            .any(|game| &game.review_id == review_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DecktrackerState {
    pub deckbuilder: DeckbuilderState,
    pub decks: Vec<DeckStats>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeckbuilderState {
    pub current_class: Option<String>,
    pub current_format: Option<GameFormat>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckStats {
    pub deckstring: DeckString,
    pub deck_name: Option<String>,
    pub games: u32,
    pub wins: u32,
    pub losses: u32,
    pub last_played: Option<DateTime<Utc>>,
}

impl DeckStats {
    pub fn empty(deckstring: DeckString, deck_name: Option<String>) -> Self {
        Self {
            deckstring,
            deck_name,
            games: 0,
            wins: 0,
            losses: 0,
            last_played: None,
        }
    }

    pub fn record(&mut self, game: &MatchRecord) {
        self.games += 1;
        match game.result {
            MatchResult::Won => self.wins += 1,
            MatchResult::Lost => self.losses += 1,
            MatchResult::Tied => {}
        }
        if self
            .last_played
            .map_or(true, |last| last < game.creation_timestamp)
        {
            self.last_played = Some(game.creation_timestamp);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DuelsState {
    pub runs: Vec<RunRecord>,
    pub live_info: Option<LiveSessionCounters>,
}

impl DuelsState {
    pub fn run_containing(&self, review_id: &ReviewId) -> Option<&RunRecord> {
        self.runs.iter().find(|run| run.contains(review_id))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BattlegroundsState {
    pub current_game: Option<BgsGame>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BgsGame {
    pub hero_card_id: CardId,
    pub mmr_at_start: Option<i32>,
    pub face_offs: Vec<BgsFaceOff>,
    pub game_ended: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BgsFaceOff {
    pub turn: u32,
    pub opponent_card_id: CardId,
    pub result: MatchResult,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MercenariesState {
    pub game_mode: Option<GameMode>,
    pub team: Vec<CardId>,
    /// Highest level seen per mercenary.
    pub levels: BTreeMap<CardId, u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppPanel {
    #[default]
    Decktracker,
    Replays,
    Battlegrounds,
    Duels,
    Mercenaries,
    Stats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeasonFilter {
    #[default]
    All,
    CurrentSeason,
    LastSeason,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NavigationState {
    pub current_app: AppPanel,
    pub battlegrounds_panel_id: Option<String>,
    pub stats_season_filter: Option<SeasonFilter>,
}
