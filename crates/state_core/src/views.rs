//! Projections consumed by presentation code.

use std::time::Duration;

use chrono::{DateTime, Datelike, Utc};
use shared::{
    domain::{CardId, GameMode, MatchRecord},
    state::{BgsFaceOff, SeasonFilter},
};

use crate::projection::ProjectionBuilder;

const FACE_OFFS_DEBOUNCE: Duration = Duration::from_millis(1000);
const PANEL_DEBOUNCE: Duration = Duration::from_millis(200);
const MERCENARIES_TEAM_DEBOUNCE: Duration = Duration::from_millis(500);

/// Most recent duels-family match. Feeds run tracking, so it is never
/// debounced.
pub fn latest_duels_match() -> ProjectionBuilder<MatchRecord> {
    ProjectionBuilder::new("latest_duels_match", |snapshot| {
        snapshot
            .state
            .stats
            .latest_of(GameMode::is_duels)
            .cloned()
    })
}

pub fn battlegrounds_face_offs() -> ProjectionBuilder<Vec<BgsFaceOff>> {
    ProjectionBuilder::new("battlegrounds_face_offs", |snapshot| {
        snapshot
            .state
            .battlegrounds
            .current_game
            .as_ref()
            .map(|game| game.face_offs.clone())
    })
    .filter(|face_offs| !face_offs.is_empty())
    .debounce(FACE_OFFS_DEBOUNCE)
}

pub fn battlegrounds_selected_panel() -> ProjectionBuilder<String> {
    ProjectionBuilder::new("battlegrounds_selected_panel", |snapshot| {
        snapshot.navigation.battlegrounds_panel_id.clone()
    })
    .debounce(PANEL_DEBOUNCE)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MercenariesTeamView {
    pub game_mode: GameMode,
    pub team: Vec<CardId>,
}

pub fn mercenaries_team() -> ProjectionBuilder<MercenariesTeamView> {
    ProjectionBuilder::new("mercenaries_team", |snapshot| {
        let mercenaries = &snapshot.state.mercenaries;
        mercenaries.game_mode.map(|game_mode| MercenariesTeamView {
            game_mode,
            team: mercenaries.team.clone(),
        })
    })
    .filter(|view| !view.team.is_empty())
    .debounce(MERCENARIES_TEAM_DEBOUNCE)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XpPoint {
    pub at: DateTime<Utc>,
    pub level: String,
}

/// Post-match levels within the selected season, oldest first. Silent until
/// a season filter has been chosen.
pub fn xp_progression() -> ProjectionBuilder<Vec<XpPoint>> {
    ProjectionBuilder::new("xp_progression", |snapshot| {
        let filter = snapshot.navigation.stats_season_filter?;
        let now = Utc::now();
        let points = snapshot
            .state
            .stats
            .game_stats
            .iter()
            .rev()
            .filter(|game| in_season(game.creation_timestamp, filter, now))
            .filter_map(|game| {
                game.level_after_match.clone().map(|level| XpPoint {
                    at: game.creation_timestamp,
                    level,
                })
            })
            .collect();
        Some(points)
    })
}

fn in_season(at: DateTime<Utc>, filter: SeasonFilter, now: DateTime<Utc>) -> bool {
    let month_index = |date: DateTime<Utc>| date.year() * 12 + date.month0() as i32;
    match filter {
        SeasonFilter::All => true,
        SeasonFilter::CurrentSeason => month_index(at) == month_index(now),
        SeasonFilter::LastSeason => month_index(at) == month_index(now) - 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn season_filter_uses_calendar_months() {
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        let december = Utc.with_ymd_and_hms(2023, 12, 31, 23, 0, 0).unwrap();
        let january = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        assert!(in_season(january, SeasonFilter::CurrentSeason, now));
        assert!(!in_season(december, SeasonFilter::CurrentSeason, now));
        assert!(in_season(december, SeasonFilter::LastSeason, now));
        assert!(in_season(december, SeasonFilter::All, now));
    }
}
