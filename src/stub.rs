//! Per-method call tracking.
//!
//! Every non-reserved member read on a facade resolves to a [`CallStub`].
//! Stubs are created on first access, keyed by name, and never removed.
//! Invoking one records the arguments and hands back the facade so the
//! chain can continue.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::facade::{Facade, FacadeId};

/// One recorded invocation of a stub.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRecord {
    /// Arguments in the order they were passed
    pub args: Vec<Value>,
    /// Facade the call was made through
    pub receiver: FacadeId,
    /// Position among all calls on the same facade, starting at 0
    pub sequence: u64,
    /// When the call happened
    pub called_at: DateTime<Utc>,
}

/// A call record tagged with the method it was made on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggedCall {
    pub method: String,
    #[serde(flatten)]
    pub record: CallRecord,
}

/// Name-keyed call records, remembering first-access order.
#[derive(Debug, Default)]
pub(crate) struct StubRegistry {
    order: Vec<String>,
    records: HashMap<String, Vec<CallRecord>>,
    next_sequence: u64,
}

impl StubRegistry {
    pub(crate) fn contains(&self, name: &str) -> bool {
        self.records.contains_key(name)
    }

    /// Register `name`. Returns false if it already existed.
    pub(crate) fn insert(&mut self, name: &str) -> bool {
        if self.contains(name) {
            return false;
        }
        self.order.push(name.to_string());
        self.records.insert(name.to_string(), Vec::new());
        true
    }

    /// Names in first-access order.
    pub(crate) fn names(&self) -> &[String] {
        &self.order
    }

    pub(crate) fn calls(&self, name: &str) -> &[CallRecord] {
        self.records.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    /// Append a call record and return the new call count for `name`.
    pub(crate) fn record(&mut self, name: &str, args: Vec<Value>, receiver: FacadeId) -> usize {
        let sequence = self.next_sequence;
        self.next_sequence += 1;

        let calls = self.records.entry(name.to_string()).or_default();
        calls.push(CallRecord {
            args,
            receiver,
            sequence,
            called_at: Utc::now(),
        });
        calls.len()
    }

    /// Every call across all stubs, ordered by sequence.
    pub(crate) fn log(&self) -> Vec<LoggedCall> {
        let mut log: Vec<LoggedCall> = self
            .order
            .iter()
            .flat_map(|name| {
                self.calls(name).iter().map(move |record| LoggedCall {
                    method: name.clone(),
                    record: record.clone(),
                })
            })
            .collect();
        log.sort_by_key(|entry| entry.record.sequence);
        log
    }
}

/// Call-tracking stand-in for one method name on one facade.
///
/// Handles are cheap to clone; all handles for the same name on the same
/// facade share one call history.
#[derive(Clone)]
pub struct CallStub {
    name: Arc<str>,
    facade: Facade,
}

impl CallStub {
    pub(crate) fn new(name: &str, facade: Facade) -> Self {
        Self {
            name: Arc::from(name),
            facade,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The facade this stub belongs to.
    pub fn facade(&self) -> &Facade {
        &self.facade
    }

    /// Invoke the stub through `this`.
    ///
    /// Fails with [`Error::AlreadyFinalized`] once the facade was executed or
    /// converted, then with [`Error::ReceiverMismatch`] if `this` is not the
    /// owning facade. Arguments are recorded as given.
    pub fn call(&self, this: &Facade, args: Vec<Value>) -> Result<Facade> {
        let mut state = self.facade.lock_state();
        if let Err(err) = state.finalization.ensure_open() {
            warn!(method = %self.name, error = %err, "Rejected call on finalized builder");
            return Err(err);
        }
        if !this.same_as(&self.facade) {
            return Err(Error::receiver_mismatch(self.name()));
        }

        let arg_count = args.len();
        let call_count = state.stubs.record(&self.name, args, this.id());
        debug!(method = %self.name, call_count, arg_count, "Recorded builder call");

        Ok(self.facade.clone())
    }

    /// All recorded calls in call order.
    pub fn calls(&self) -> Vec<CallRecord> {
        self.facade.lock_state().stubs.calls(&self.name).to_vec()
    }

    pub fn call_count(&self) -> usize {
        self.facade.lock_state().stubs.calls(&self.name).len()
    }

    pub fn was_called(&self) -> bool {
        self.call_count() > 0
    }

    /// Argument lists of every call, in call order.
    pub fn args(&self) -> Vec<Vec<Value>> {
        self.facade
            .lock_state()
            .stubs
            .calls(&self.name)
            .iter()
            .map(|record| record.args.clone())
            .collect()
    }

    pub fn nth_call(&self, n: usize) -> Option<CallRecord> {
        self.facade.lock_state().stubs.calls(&self.name).get(n).cloned()
    }

    pub fn first_call(&self) -> Option<CallRecord> {
        self.nth_call(0)
    }

    pub fn last_call(&self) -> Option<CallRecord> {
        self.facade
            .lock_state()
            .stubs
            .calls(&self.name)
            .last()
            .cloned()
    }

    /// Whether any call received exactly `args`.
    pub fn called_with(&self, args: &[Value]) -> bool {
        self.facade
            .lock_state()
            .stubs
            .calls(&self.name)
            .iter()
            .any(|record| record.args == args)
    }

    /// Whether this stub's first call happened before `other`'s first call.
    ///
    /// False when either stub was never called or they live on different
    /// facades.
    pub fn was_called_before(&self, other: &CallStub) -> bool {
        if !self.facade.same_as(&other.facade) {
            return false;
        }
        match (self.first_call(), other.first_call()) {
            (Some(mine), Some(theirs)) => mine.sequence < theirs.sequence,
            _ => false,
        }
    }

    /// Whether both handles refer to the same stand-in.
    pub fn ptr_eq(&self, other: &CallStub) -> bool {
        self.facade.same_as(&other.facade) && self.name == other.name
    }
}

impl PartialEq for CallStub {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for CallStub {}

impl std::fmt::Debug for CallStub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallStub")
            .field("name", &self.name)
            .field("facade", &self.facade.id())
            .field("call_count", &self.call_count())
            .finish()
    }
}
