use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TallyParseError;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

id_newtype!(ReviewId);
id_newtype!(CardId);
id_newtype!(DeckString);

/// Identifier of one logical run. Minted fresh for every new run and reused
/// verbatim for continuations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GameMode {
    Ranked,
    Casual,
    Arena,
    Duels,
    PaidDuels,
    Battlegrounds,
    Mercenaries,
    MercenariesPvp,
    Practice,
}

impl GameMode {
    pub fn is_duels(self) -> bool {
        matches!(self, GameMode::Duels | GameMode::PaidDuels)
    }

    pub fn is_mercenaries(self) -> bool {
        matches!(self, GameMode::Mercenaries | GameMode::MercenariesPvp)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchResult {
    Won,
    Lost,
    Tied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameFormat {
    Standard,
    Wild,
    Classic,
    Twist,
}

/// Win/loss record a match reports for its run, as it stood when the match
/// began. Serialized as `"W-L"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RunTally {
    pub wins: u32,
    pub losses: u32,
}

impl RunTally {
    pub const fn new(wins: u32, losses: u32) -> Self {
        Self { wins, losses }
    }

    pub fn is_zero(&self) -> bool {
        self.wins == 0 && self.losses == 0
    }

    /// Record after a match with `result` has been played from this tally.
    /// Counters saturate instead of wrapping.
    pub fn after(&self, result: MatchResult) -> Self {
        match result {
            MatchResult::Won => Self::new(self.wins.saturating_add(1), self.losses),
            MatchResult::Lost => Self::new(self.wins, self.losses.saturating_add(1)),
            MatchResult::Tied => *self,
        }
    }
}

impl fmt::Display for RunTally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.wins, self.losses)
    }
}

impl FromStr for RunTally {
    type Err = TallyParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        let (wins, losses) = trimmed
            .split_once('-')
            .ok_or_else(|| TallyParseError::MissingSeparator(trimmed.to_string()))?;
        let parse = |part: &str| {
            part.trim()
                .parse::<u32>()
                .map_err(|source| TallyParseError::InvalidCount {
                    raw: trimmed.to_string(),
                    source,
                })
        };
        Ok(Self::new(parse(wins)?, parse(losses)?))
    }
}

impl Serialize for RunTally {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RunTally {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// One completed game. Never edited after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub review_id: ReviewId,
    pub game_mode: GameMode,
    pub result: MatchResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_result: Option<RunTally>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<RunId>,
    pub creation_timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_format: Option<GameFormat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_card_id: Option<CardId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_decklist: Option<DeckString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opponent_card_id: Option<CardId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opponent_class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_rank: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_player_rank: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level_after_match: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_duration_seconds: Option<u32>,
}

impl MatchRecord {
    pub fn new(
        review_id: ReviewId,
        game_mode: GameMode,
        result: MatchResult,
        creation_timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            review_id,
            game_mode,
            result,
            additional_result: None,
            run_id: None,
            creation_timestamp,
            game_format: None,
            player_card_id: None,
            player_class: None,
            player_decklist: None,
            opponent_card_id: None,
            opponent_class: None,
            player_rank: None,
            new_player_rank: None,
            level_after_match: None,
            game_duration_seconds: None,
        }
    }

    pub fn with_tally(mut self, tally: RunTally) -> Self {
        self.additional_result = Some(tally);
        self
    }

    pub fn with_run_id(mut self, run_id: RunId) -> Self {
        self.run_id = Some(run_id);
        self
    }
}

/// Live counters reported by the running game session, independent of any
/// finished match.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LiveSessionCounters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hero_card_id: Option<CardId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starting_hero_power: Option<CardId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_class: Option<String>,
    pub wins: u32,
    pub losses: u32,
    #[serde(default)]
    pub rating: i32,
    #[serde(default)]
    pub paid_rating: i32,
    #[serde(default)]
    pub last_rating_change: i32,
    #[serde(default)]
    pub deck_list: Vec<CardId>,
}

impl LiveSessionCounters {
    pub fn tally(&self) -> RunTally {
        RunTally::new(self.wins, self.losses)
    }

    /// Compares only the attributes that characterise a run. The deck list is
    /// left out because it grows as the run progresses.
    pub fn same_run_characteristics(&self, other: &Self) -> bool {
        self.hero_card_id == other.hero_card_id
            && self.rating == other.rating
            && self.paid_rating == other.paid_rating
            && self.wins == other.wins
            && self.losses == other.losses
            && self.starting_hero_power == other.starting_hero_power
            && self.player_class == other.player_class
    }
}

/// One multi-match progression. Extending a run yields a new value; the
/// previous one is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    pub id: RunId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hero_card_id: Option<CardId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hero_power_card_id: Option<CardId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature_treasure_card_id: Option<CardId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating_at_start: Option<i32>,
    pub wins: u32,
    pub losses: u32,
    pub steps: Vec<ReviewId>,
}

impl RunRecord {
    pub fn start(id: RunId) -> Self {
        Self {
            id,
            hero_card_id: None,
            hero_power_card_id: None,
            signature_treasure_card_id: None,
            rating_at_start: None,
            wins: 0,
            losses: 0,
            steps: Vec::new(),
        }
    }

    pub fn tally(&self) -> RunTally {
        RunTally::new(self.wins, self.losses)
    }

    pub fn contains(&self, review_id: &ReviewId) -> bool {
        self.steps.iter().any(|step| step == review_id)
    }

    /// Appends `game` to the run. Counters only ever move forward: the
    /// larger of the current value and the match's post-game record wins.
    pub fn extended_with(&self, game: &MatchRecord) -> Self {
        let mut next = self.clone();
        if next.contains(&game.review_id) {
            return next;
        }
        let observed = game
            .additional_result
            .unwrap_or_else(|| self.tally())
            .after(game.result);
        next.wins = next.wins.max(observed.wins);
        next.losses = next.losses.max(observed.losses);
        next.steps.push(game.review_id.clone());
        if next.hero_card_id.is_none() {
            next.hero_card_id = game.player_card_id.clone();
        }
        next
    }
}
