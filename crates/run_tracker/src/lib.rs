//! Run boundary detection for duels-family matches.

pub mod config;
pub mod detector;
pub mod service;

pub use config::RunBoundaryConfig;
pub use detector::{
    BoundaryReason, ContinuationReason, DetectorInputs, RunBoundaryDetector, RunDecision,
};
pub use service::{detector_inputs, RunIdService};

#[cfg(test)]
#[path = "tests/detector_tests.rs"]
mod detector_tests;
