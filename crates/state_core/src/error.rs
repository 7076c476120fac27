use serde::Serialize;
use shared::{error::ErrorCode, events::EventKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("processor for {expected} received a {actual} event")]
    UnexpectedEvent {
        expected: EventKind,
        actual: EventKind,
    },
    #[error("preferences unavailable: {0}")]
    Preferences(#[source] anyhow::Error),
    #[error("invalid event payload: {0}")]
    InvalidPayload(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ProcessorError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ProcessorError::UnexpectedEvent { .. } => ErrorCode::UnexpectedEvent,
            ProcessorError::Preferences(_) => ErrorCode::Preferences,
            ProcessorError::InvalidPayload(_) => ErrorCode::Validation,
            ProcessorError::Other(_) => ErrorCode::Internal,
        }
    }
}

/// Published when an event could not be applied. The snapshot stays at its
/// pre-event value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessingFailure {
    pub seq: u64,
    pub kind: EventKind,
    pub code: ErrorCode,
    pub message: String,
}
