use std::num::ParseIntError;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    UnexpectedEvent,
    Preferences,
    Validation,
    Panicked,
    Internal,
}

#[derive(Debug, Error)]
pub enum TallyParseError {
    #[error("tally '{0}' is not of the form W-L")]
    MissingSeparator(String),
    #[error("tally '{raw}' has a non-numeric count: {source}")]
    InvalidCount {
        raw: String,
        #[source]
        source: ParseIntError,
    },
}
