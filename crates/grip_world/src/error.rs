//! Error types and result alias for the crate.
//!
//! This module defines [`enum@crate::error::Error`] and the crate-wide [Result] alias. Variants cover
//! invalid configuration and shapes, illegal placements, lookup misses for unknown ids,
//! internal consistency violations between the scene and its grids, and runtime plumbing
//! failures of the loop scheduler.
//!
//! Rejected moves are not errors: the mover reports them as
//! [`crate::scene::mover::ActionOutcome::Rejected`].
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid shape: {0}")]
    InvalidShape(String),

    #[error("missing shape definition for type '{kind}'")]
    MissingShape { kind: String },

    #[error("position of object '{id}' is occupied or out of bounds")]
    PositionOccupied { id: String },

    #[error("position of '{id}' is out of bounds or not finite")]
    OutOfBounds { id: String },

    #[error("unknown object '{id}'")]
    UnknownObject { id: String },

    #[error("unknown target '{id}'")]
    UnknownTarget { id: String },

    #[error("unknown gripper '{id}'")]
    UnknownGripper { id: String },

    #[error("id '{id}' is already in use")]
    DuplicateId { id: String },

    /// The scene and its occupancy grids disagree. Processing of the scene should stop.
    #[error("scene consistency violated: {0}")]
    Inconsistent(String),

    /// A room refuses mutations after a consistency violation until its scene is replaced.
    #[error("room halted after a consistency violation: {reason}")]
    Halted { reason: String },

    #[error("looped actions require a running tokio runtime")]
    NoRuntime,

    #[error("room state lock was poisoned")]
    Poisoned,

    #[error("{0}")]
    Other(String),
}

impl From<String> for Error {
    fn from(value: String) -> Self {
        Error::Other(value)
    }
}

impl From<&str> for Error {
    fn from(value: &str) -> Self {
        Error::Other(value.to_owned())
    }
}
