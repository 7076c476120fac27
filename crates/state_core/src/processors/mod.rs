//! Processors for every event kind the application emits.

mod decktracker;
mod navigation;
mod session;
mod stats;

use std::sync::Arc;

use shared::{cards::CardCatalog, events::EventKind};
use storage::PreferencesStore;

use crate::registry::ProcessorRegistry;

pub use decktracker::{DeckbuilderSelectionProcessor, EjectDeckVersionProcessor, SaveDeckProcessor};
pub use navigation::NavigationProcessor;
pub use session::{BattlegroundsProcessor, DuelsInfoProcessor, MercenariesTeamProcessor};
pub use stats::RecomputeGameStatsProcessor;

/// Registry with a processor for each [`EventKind`].
pub fn default_registry(
    prefs: Arc<dyn PreferencesStore>,
    catalog: Arc<dyn CardCatalog>,
) -> ProcessorRegistry {
    let deckbuilder = Arc::new(DeckbuilderSelectionProcessor);
    let battlegrounds = Arc::new(BattlegroundsProcessor);
    let navigation = Arc::new(NavigationProcessor);

    ProcessorRegistry::new()
        .with(
            EventKind::RecomputeGameStats,
            Arc::new(RecomputeGameStatsProcessor::new(Arc::clone(&prefs), catalog)),
        )
        .with(
            EventKind::ConstructedDeckbuilderClassSelected,
            deckbuilder.clone(),
        )
        .with(EventKind::ConstructedDeckbuilderFormatSelected, deckbuilder)
        .with(
            EventKind::ConstructedDeckbuilderSaveDeck,
            Arc::new(SaveDeckProcessor::new(Arc::clone(&prefs))),
        )
        .with(
            EventKind::ConstructedEjectDeckVersion,
            Arc::new(EjectDeckVersionProcessor::new(prefs)),
        )
        .with(EventKind::DuelsInfoUpdated, Arc::new(DuelsInfoProcessor))
        .with(EventKind::BgsGameStarted, battlegrounds.clone())
        .with(EventKind::BgsFaceOffRecorded, battlegrounds.clone())
        .with(EventKind::BgsGameEnded, battlegrounds)
        .with(
            EventKind::MercenariesTeamUpdated,
            Arc::new(MercenariesTeamProcessor),
        )
        .with(EventKind::NavigateTo, navigation.clone())
        .with(EventKind::SelectBattlegroundsPanel, navigation.clone())
        .with(EventKind::ChangeStatsSeasonFilter, navigation)
}
