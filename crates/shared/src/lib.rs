pub mod cards;
pub mod domain;
pub mod error;
pub mod events;
pub mod preferences;
pub mod state;
