//! Forward-only finalization state machine.

use serde::{Deserialize, Serialize};

use crate::error::{Error, FinalizedBy, Result};
use crate::outcome::{Execution, Outcome};

/// Finalization state of a builder.
///
/// `Open` moves to exactly one of the terminal states and never back.
#[derive(Debug, Clone, Default)]
pub enum Finalization {
    #[default]
    Open,
    /// Awaited; holds the memoized deferred computation
    Executed(Execution),
    /// The terminal conversion member was called
    Converted,
}

impl Finalization {
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }

    /// The terminal cause, or `None` while open.
    pub fn finalized_by(&self) -> Option<FinalizedBy> {
        match self {
            Self::Open => None,
            Self::Executed(_) => Some(FinalizedBy::Executed),
            Self::Converted => Some(FinalizedBy::Converted),
        }
    }

    pub fn kind(&self) -> FinalizationKind {
        match self {
            Self::Open => FinalizationKind::Open,
            Self::Executed(_) => FinalizationKind::Executed,
            Self::Converted => FinalizationKind::Converted,
        }
    }

    /// Fail with [`Error::AlreadyFinalized`] unless still open.
    pub fn ensure_open(&self) -> Result<()> {
        match self.finalized_by() {
            None => Ok(()),
            Some(cause) => Err(Error::already_finalized(cause)),
        }
    }

    /// Return the memoized computation, creating it from `outcome` on the
    /// first call.
    ///
    /// Returns `None` once converted: a converted builder never settles an
    /// outcome, so the caller decides what awaiting it means.
    pub fn execute(&mut self, outcome: &Outcome) -> Option<(Execution, bool)> {
        match self {
            Self::Open => {
                let execution = outcome.materialize();
                *self = Self::Executed(execution.clone());
                Some((execution, true))
            }
            Self::Executed(execution) => Some((execution.clone(), false)),
            Self::Converted => None,
        }
    }

    /// Move to `Converted`. Fails if already executed or converted.
    pub fn convert(&mut self) -> Result<()> {
        self.ensure_open()?;
        *self = Self::Converted;
        Ok(())
    }
}

/// Serializable discriminant of [`Finalization`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalizationKind {
    Open,
    Executed,
    Converted,
}
