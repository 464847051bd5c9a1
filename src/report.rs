//! Serializable snapshot of a builder, for golden-file style assertions.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::facade::{BuilderState, FacadeId};
use crate::finalization::FinalizationKind;
use crate::outcome::OutcomeKind;

/// Calls recorded on one stub.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StubReport {
    pub name: String,
    pub call_count: usize,
    /// Argument lists in call order
    pub calls: Vec<Vec<Value>>,
}

/// Point-in-time view of a builder's state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuilderReport {
    pub label: String,
    pub facade_id: FacadeId,
    pub finalization: FinalizationKind,
    pub outcome: OutcomeKind,
    /// Stubs in creation order
    pub stubs: Vec<StubReport>,
}

impl BuilderReport {
    pub(crate) fn capture(label: &str, facade_id: FacadeId, state: &BuilderState) -> Self {
        let stubs = state
            .stubs
            .names()
            .iter()
            .map(|name| {
                let calls: Vec<Vec<Value>> = state
                    .stubs
                    .calls(name)
                    .iter()
                    .map(|record| record.args.clone())
                    .collect();
                StubReport {
                    name: name.clone(),
                    call_count: calls.len(),
                    calls,
                }
            })
            .collect();

        Self {
            label: label.to_string(),
            facade_id,
            finalization: state.finalization.kind(),
            outcome: state.outcome.kind(),
            stubs,
        }
    }

    pub fn stub(&self, name: &str) -> Option<&StubReport> {
        self.stubs.iter().find(|stub| stub.name == name)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
