//! Startup-time configuration errors.
//!
//! Nothing on the per-tick path returns these; once a [`crate::WeatherEngine`]
//! exists every failure degrades to "no effect this frame".

use thiserror::Error;

use crate::catalog::DisasterKind;

#[derive(Debug, Error, PartialEq)]
pub enum DisasterError {
    /// A config entry references an archetype that is disabled or unknown.
    #[error("archetype {0:?} is referenced but not present in the catalog")]
    MissingArchetype(DisasterKind),
    /// Every archetype was disabled or has a non-positive weight.
    #[error("catalog has no archetype with a positive selection weight")]
    NoSelectableArchetypes,
    #[error("invalid weather config: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, DisasterError>;
