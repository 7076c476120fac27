use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    domain::{CardId, DeckString, GameFormat, GameMode, LiveSessionCounters, MatchRecord},
    state::{AppPanel, BgsFaceOff, SeasonFilter},
};

/// Everything the store can be asked to apply. Events are plain values and
/// may be replayed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum StoreEvent {
    RecomputeGameStats {
        game_stat: MatchRecord,
    },
    ConstructedDeckbuilderClassSelected {
        player_class: String,
    },
    ConstructedDeckbuilderFormatSelected {
        format: GameFormat,
    },
    ConstructedDeckbuilderSaveDeck {
        deckstring: DeckString,
        deck_name: String,
    },
    ConstructedEjectDeckVersion {
        deckstring_to_eject: DeckString,
    },
    DuelsInfoUpdated {
        info: LiveSessionCounters,
    },
    BgsGameStarted {
        hero_card_id: CardId,
        #[serde(default)]
        mmr_at_start: Option<i32>,
    },
    BgsFaceOffRecorded {
        face_off: BgsFaceOff,
    },
    BgsGameEnded,
    MercenariesTeamUpdated {
        game_mode: GameMode,
        team: Vec<CardId>,
        #[serde(default)]
        levels: Vec<(CardId, u32)>,
    },
    NavigateTo {
        app: AppPanel,
    },
    SelectBattlegroundsPanel {
        panel_id: String,
    },
    ChangeStatsSeasonFilter {
        filter: SeasonFilter,
    },
}

/// Discriminant of [`StoreEvent`], used to key processors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    RecomputeGameStats,
    ConstructedDeckbuilderClassSelected,
    ConstructedDeckbuilderFormatSelected,
    ConstructedDeckbuilderSaveDeck,
    ConstructedEjectDeckVersion,
    DuelsInfoUpdated,
    BgsGameStarted,
    BgsFaceOffRecorded,
    BgsGameEnded,
    MercenariesTeamUpdated,
    NavigateTo,
    SelectBattlegroundsPanel,
    ChangeStatsSeasonFilter,
}

impl EventKind {
    pub const ALL: [EventKind; 13] = [
        EventKind::RecomputeGameStats,
        EventKind::ConstructedDeckbuilderClassSelected,
        EventKind::ConstructedDeckbuilderFormatSelected,
        EventKind::ConstructedDeckbuilderSaveDeck,
        EventKind::ConstructedEjectDeckVersion,
        EventKind::DuelsInfoUpdated,
        EventKind::BgsGameStarted,
        EventKind::BgsFaceOffRecorded,
        EventKind::BgsGameEnded,
        EventKind::MercenariesTeamUpdated,
        EventKind::NavigateTo,
        EventKind::SelectBattlegroundsPanel,
        EventKind::ChangeStatsSeasonFilter,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::RecomputeGameStats => "recompute_game_stats",
            EventKind::ConstructedDeckbuilderClassSelected => {
                "constructed_deckbuilder_class_selected"
            }
            EventKind::ConstructedDeckbuilderFormatSelected => {
                "constructed_deckbuilder_format_selected"
            }
            EventKind::ConstructedDeckbuilderSaveDeck => "constructed_deckbuilder_save_deck",
            EventKind::ConstructedEjectDeckVersion => "constructed_eject_deck_version",
            EventKind::DuelsInfoUpdated => "duels_info_updated",
            EventKind::BgsGameStarted => "bgs_game_started",
            EventKind::BgsFaceOffRecorded => "bgs_face_off_recorded",
            EventKind::BgsGameEnded => "bgs_game_ended",
            EventKind::MercenariesTeamUpdated => "mercenaries_team_updated",
            EventKind::NavigateTo => "navigate_to",
            EventKind::SelectBattlegroundsPanel => "select_battlegrounds_panel",
            EventKind::ChangeStatsSeasonFilter => "change_stats_season_filter",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl StoreEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            StoreEvent::RecomputeGameStats { .. } => EventKind::RecomputeGameStats,
            StoreEvent::ConstructedDeckbuilderClassSelected { .. } => {
                EventKind::ConstructedDeckbuilderClassSelected
            }
            StoreEvent::ConstructedDeckbuilderFormatSelected { .. } => {
                EventKind::ConstructedDeckbuilderFormatSelected
            }
            StoreEvent::ConstructedDeckbuilderSaveDeck { .. } => {
                EventKind::ConstructedDeckbuilderSaveDeck
            }
            StoreEvent::ConstructedEjectDeckVersion { .. } => {
                EventKind::ConstructedEjectDeckVersion
            }
            StoreEvent::DuelsInfoUpdated { .. } => EventKind::DuelsInfoUpdated,
            StoreEvent::BgsGameStarted { .. } => EventKind::BgsGameStarted,
            StoreEvent::BgsFaceOffRecorded { .. } => EventKind::BgsFaceOffRecorded,
            StoreEvent::BgsGameEnded => EventKind::BgsGameEnded,
            StoreEvent::MercenariesTeamUpdated { .. } => EventKind::MercenariesTeamUpdated,
            StoreEvent::NavigateTo { .. } => EventKind::NavigateTo,
            StoreEvent::SelectBattlegroundsPanel { .. } => EventKind::SelectBattlegroundsPanel,
            StoreEvent::ChangeStatsSeasonFilter { .. } => EventKind::ChangeStatsSeasonFilter,
        }
    }
}
