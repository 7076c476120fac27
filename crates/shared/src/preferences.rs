use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{DeckString, GameFormat};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub constructed_personal_additional_decks: Vec<PersonalDeck>,
    pub constructed_deck_versions: Vec<DeckVersionLink>,
    pub appear_on_live_streams: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonalDeck {
    pub deckstring: DeckString,
    pub deck_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<GameFormat>,
    pub last_used: DateTime<Utc>,
}

/// Groups successive versions of one deck under a shared name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckVersionLink {
    pub name: String,
    pub versions: Vec<DeckVersion>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckVersion {
    pub deckstring: DeckString,
}
