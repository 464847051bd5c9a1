//! Error types for fake-query-builder.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using fake-query-builder's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// The event that moved a builder out of its open state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalizedBy {
    /// The builder was awaited (its deferred computation was created).
    Executed,
    /// The terminal conversion member was called.
    Converted,
}

impl fmt::Display for FinalizedBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Executed => "executed",
            Self::Converted => "converted",
        };
        write!(f, "{}", s)
    }
}

/// Usage errors raised by a fake builder.
#[derive(Error, Debug)]
pub enum Error {
    /// Mutation attempted after the builder was executed or converted
    #[error("FakeBuilder cannot be changed once {cause}")]
    AlreadyFinalized { cause: FinalizedBy },

    /// A member was invoked through an object other than its own facade
    #[error("{member} called with a different object as this")]
    ReceiverMismatch { member: String },

    /// A reserved member was used where a chainable call was expected
    #[error("{member} is a reserved member and does not return the builder")]
    NotChainable { member: String },

    /// Invalid builder configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error while loading configuration
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create an already-finalized error.
    pub fn already_finalized(cause: FinalizedBy) -> Self {
        Self::AlreadyFinalized { cause }
    }

    /// Create a receiver mismatch error for the named member.
    pub fn receiver_mismatch(member: impl Into<String>) -> Self {
        Self::ReceiverMismatch {
            member: member.into(),
        }
    }

    /// Create a not-chainable error for a reserved member.
    pub fn not_chainable(member: impl Into<String>) -> Self {
        Self::NotChainable {
            member: member.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// The finalization cause, if this is an already-finalized error.
    pub fn finalized_by(&self) -> Option<FinalizedBy> {
        match self {
            Self::AlreadyFinalized { cause } => Some(*cause),
            _ => None,
        }
    }

    pub fn is_already_finalized(&self) -> bool {
        matches!(self, Self::AlreadyFinalized { .. })
    }

    pub fn is_receiver_mismatch(&self) -> bool {
        matches!(self, Self::ReceiverMismatch { .. })
    }
}
