//! Single-owner application state store.
//!
//! Events go in through [`store::StateStore::submit`], are applied one at a
//! time by the processor registered for their kind, and every result is
//! published as a [`store::StoreSnapshot`]. Projections in [`projection`]
//! derive narrower, deduplicated and optionally debounced values from those
//! snapshots.

pub mod error;
pub mod history;
pub mod processors;
pub mod projection;
pub mod registry;
pub mod store;
pub mod views;

pub use error::{ProcessingFailure, ProcessorError};
pub use processors::default_registry;
pub use projection::{ProjectionBuilder, ProjectionHandle, ProjectionSubscription};
pub use registry::{Processor, ProcessorOutput, ProcessorRegistry};
pub use store::{SnapshotSource, SnapshotSubscription, StateStore, StoreConfig, StoreSnapshot};

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod store_tests;

#[cfg(test)]
#[path = "tests/projection_tests.rs"]
mod projection_tests;

#[cfg(test)]
#[path = "tests/processors_tests.rs"]
mod processors_tests;
