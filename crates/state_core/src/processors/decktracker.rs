use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use shared::{
    events::{EventKind, StoreEvent},
    preferences::PersonalDeck,
    state::{ApplicationState, DeckbuilderState, DecktrackerState, NavigationState},
};
use storage::PreferencesStore;
use tracing::debug;

use crate::{
    error::ProcessorError,
    history::StateHistory,
    registry::{unexpected_event, Processor, ProcessorOutput},
};

/// Class and format pickers of the deckbuilder.
pub struct DeckbuilderSelectionProcessor;

#[async_trait]
impl Processor for DeckbuilderSelectionProcessor {
    async fn process(
        &self,
        event: &StoreEvent,
        state: &ApplicationState,
        _history: &StateHistory,
        _navigation: &NavigationState,
    ) -> Result<ProcessorOutput, ProcessorError> {
        let current = &state.decktracker.deckbuilder;
        let deckbuilder = match event {
            StoreEvent::ConstructedDeckbuilderClassSelected { player_class } => DeckbuilderState {
                current_class: Some(player_class.to_ascii_lowercase()),
                ..current.clone()
            },
            StoreEvent::ConstructedDeckbuilderFormatSelected { format } => DeckbuilderState {
                current_format: Some(*format),
                ..current.clone()
            },
            other => {
                return Err(unexpected_event(
                    other,
                    EventKind::ConstructedDeckbuilderClassSelected,
                ))
            }
        };

        Ok(ProcessorOutput::state(state.with_decktracker(
            DecktrackerState {
                deckbuilder,
                ..state.decktracker.clone()
            },
        )))
    }
}

/// Saves the deckbuilder's deck into the personal deck list. Only the
/// preferences change.
pub struct SaveDeckProcessor {
    prefs: Arc<dyn PreferencesStore>,
}

impl SaveDeckProcessor {
    pub fn new(prefs: Arc<dyn PreferencesStore>) -> Self {
        Self { prefs }
    }
}

#[async_trait]
impl Processor for SaveDeckProcessor {
    async fn process(
        &self,
        event: &StoreEvent,
        state: &ApplicationState,
        _history: &StateHistory,
        _navigation: &NavigationState,
    ) -> Result<ProcessorOutput, ProcessorError> {
        let StoreEvent::ConstructedDeckbuilderSaveDeck {
            deckstring,
            deck_name,
        } = event
        else {
            return Err(unexpected_event(
                event,
                EventKind::ConstructedDeckbuilderSaveDeck,
            ));
        };
        if deckstring.as_str().trim().is_empty() {
            return Err(ProcessorError::InvalidPayload(
                "cannot save a deck without a deckstring".into(),
            ));
        }

        let mut prefs = self.prefs.get().await.map_err(ProcessorError::Preferences)?;
        let deckbuilder = &state.decktracker.deckbuilder;
        let new_deck = PersonalDeck {
            deckstring: deckstring.clone(),
            deck_name: deck_name.clone(),
            player_class: deckbuilder.current_class.clone(),
            format: deckbuilder.current_format,
            last_used: Utc::now(),
        };

        let decks = &mut prefs.constructed_personal_additional_decks;
        match decks.iter_mut().find(|deck| deck.deckstring == *deckstring) {
            Some(existing) => *existing = new_deck,
            None => decks.push(new_deck),
        }
        debug!(%deckstring, total = decks.len(), "saving personal deck");

        self.prefs
            .save(&prefs)
            .await
            .map_err(ProcessorError::Preferences)?;
        Ok(ProcessorOutput::unchanged())
    }
}

/// Removes one deckstring from every version link.
pub struct EjectDeckVersionProcessor {
    prefs: Arc<dyn PreferencesStore>,
}

impl EjectDeckVersionProcessor {
    pub fn new(prefs: Arc<dyn PreferencesStore>) -> Self {
        Self { prefs }
    }
}

#[async_trait]
impl Processor for EjectDeckVersionProcessor {
    async fn process(
        &self,
        event: &StoreEvent,
        _state: &ApplicationState,
        _history: &StateHistory,
        _navigation: &NavigationState,
    ) -> Result<ProcessorOutput, ProcessorError> {
        let StoreEvent::ConstructedEjectDeckVersion {
            deckstring_to_eject,
        } = event
        else {
            return Err(unexpected_event(event, EventKind::ConstructedEjectDeckVersion));
        };

        let mut prefs = self.prefs.get().await.map_err(ProcessorError::Preferences)?;
        for link in &mut prefs.constructed_deck_versions {
            link.versions
                .retain(|version| version.deckstring != *deckstring_to_eject);
        }
        debug!(%deckstring_to_eject, "ejected deck version");

        self.prefs
            .save(&prefs)
            .await
            .map_err(ProcessorError::Preferences)?;
        Ok(ProcessorOutput::unchanged())
    }
}
