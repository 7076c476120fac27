use async_trait::async_trait;
use shared::{
    events::{EventKind, StoreEvent},
    state::{AppPanel, ApplicationState, NavigationState},
};

use crate::{
    error::ProcessorError,
    history::StateHistory,
    registry::{unexpected_event, Processor, ProcessorOutput},
};

pub struct NavigationProcessor;

#[async_trait]
impl Processor for NavigationProcessor {
    async fn process(
        &self,
        event: &StoreEvent,
        _state: &ApplicationState,
        _history: &StateHistory,
        navigation: &NavigationState,
    ) -> Result<ProcessorOutput, ProcessorError> {
        let next = match event {
            StoreEvent::NavigateTo { app } => NavigationState {
                current_app: *app,
                ..navigation.clone()
            },
            StoreEvent::SelectBattlegroundsPanel { panel_id } => NavigationState {
                current_app: AppPanel::Battlegrounds,
                battlegrounds_panel_id: Some(panel_id.clone()),
                ..navigation.clone()
            },
            StoreEvent::ChangeStatsSeasonFilter { filter } => NavigationState {
                stats_season_filter: Some(*filter),
                ..navigation.clone()
            },
            other => return Err(unexpected_event(other, EventKind::NavigateTo)),
        };

        if next == *navigation {
            return Ok(ProcessorOutput::unchanged());
        }
        Ok(ProcessorOutput::navigation(next))
    }
}
