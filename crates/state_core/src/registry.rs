use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use shared::{
    events::{EventKind, StoreEvent},
    state::{ApplicationState, NavigationState},
};
use tracing::warn;

use crate::{error::ProcessorError, history::StateHistory};

/// What a processor hands back. `None` in a slot leaves that half of the
/// snapshot untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessorOutput {
    pub state: Option<ApplicationState>,
    pub navigation: Option<NavigationState>,
}

impl ProcessorOutput {
    pub fn unchanged() -> Self {
        Self::default()
    }

    pub fn state(state: ApplicationState) -> Self {
        Self {
            state: Some(state),
            navigation: None,
        }
    }

    pub fn navigation(navigation: NavigationState) -> Self {
        Self {
            state: None,
            navigation: Some(navigation),
        }
    }

    pub fn is_unchanged(&self) -> bool {
        self.state.is_none() && self.navigation.is_none()
    }
}

/// Business logic for one event kind. Implementations must not mutate their
/// inputs; they may await external I/O before returning.
#[async_trait]
pub trait Processor: Send + Sync {
    async fn process(
        &self,
        event: &StoreEvent,
        state: &ApplicationState,
        history: &StateHistory,
        navigation: &NavigationState,
    ) -> Result<ProcessorOutput, ProcessorError>;
}

#[derive(Default, Clone)]
pub struct ProcessorRegistry {
    processors: HashMap<EventKind, Arc<dyn Processor>>,
}

impl ProcessorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `processor` for `kind`, returning the one it replaced.
    pub fn register(
        &mut self,
        kind: EventKind,
        processor: Arc<dyn Processor>,
    ) -> Option<Arc<dyn Processor>> {
        let previous = self.processors.insert(kind, processor);
        if previous.is_some() {
            warn!(%kind, "replacing previously registered processor");
        }
        previous
    }

    pub fn with(mut self, kind: EventKind, processor: Arc<dyn Processor>) -> Self {
        self.register(kind, processor);
        self
    }

    pub fn resolve(&self, kind: EventKind) -> Option<Arc<dyn Processor>> {
        self.processors.get(&kind).cloned()
    }

    pub fn kinds(&self) -> Vec<EventKind> {
        let mut kinds: Vec<_> = self.processors.keys().copied().collect();
        kinds.sort();
        kinds
    }

    pub fn len(&self) -> usize {
        self.processors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }
}

/// Error for a processor handed an event of a kind it was not registered for.
pub(crate) fn unexpected_event(event: &StoreEvent, expected: EventKind) -> ProcessorError {
    ProcessorError::UnexpectedEvent {
        expected,
        actual: event.kind(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;

    #[async_trait]
    impl Processor for Noop {
        async fn process(
            &self,
            _event: &StoreEvent,
            _state: &ApplicationState,
            _history: &StateHistory,
            _navigation: &NavigationState,
        ) -> Result<ProcessorOutput, ProcessorError> {
            Ok(ProcessorOutput::unchanged())
        }
    }

    #[test]
    fn registration_is_additive_and_replaces_same_kind() {
        let mut registry = ProcessorRegistry::new();
        assert!(registry.resolve(EventKind::NavigateTo).is_none());

        assert!(registry
            .register(EventKind::NavigateTo, Arc::new(Noop))
            .is_none());
        assert!(registry
            .register(EventKind::BgsGameEnded, Arc::new(Noop))
            .is_none());
        assert!(registry
            .register(EventKind::NavigateTo, Arc::new(Noop))
            .is_some());

        assert_eq!(registry.len(), 2);
        assert_eq!(
            registry.kinds(),
            vec![EventKind::BgsGameEnded, EventKind::NavigateTo]
        );
        assert!(registry.resolve(EventKind::BgsGameEnded).is_some());
        assert!(registry.resolve(EventKind::DuelsInfoUpdated).is_none());
    }
}
