//! The dynamic facade handed to code under test.
//!
//! A [`Facade`] has an unbounded member surface. [`Facade::get`] is the single
//! dispatch point: the reserved members from [`BuilderConfig`] are matched
//! first, and every other name resolves to a [`CallStub`] that is created on
//! first access. Awaiting the facade (`facade.await`) goes through the
//! reserved execution member.

use std::future::IntoFuture;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::BuilderConfig;
use crate::error::{Error, FinalizedBy, Result};
use crate::finalization::{Finalization, FinalizationKind};
use crate::outcome::{Execution, Outcome, Settlement};
use crate::stub::{CallStub, StubRegistry};

/// Identity of a facade, used for receiver checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FacadeId(pub Uuid);

impl FacadeId {
    /// Generate a new random facade ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for FacadeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for FacadeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Mutable state shared by a facade, its stubs, and its controller.
#[derive(Debug, Default)]
pub(crate) struct BuilderState {
    pub(crate) outcome: Outcome,
    pub(crate) finalization: Finalization,
    pub(crate) stubs: StubRegistry,
}

impl BuilderState {
    /// Like [`Finalization::ensure_open`], logging the rejected member.
    pub(crate) fn ensure_open_for(&self, member: &str) -> Result<()> {
        self.finalization.ensure_open().map_err(|err| {
            warn!(member, error = %err, "Rejected mutation of finalized builder");
            err
        })
    }
}

struct Core {
    id: FacadeId,
    config: BuilderConfig,
    /// Returned by the terminal conversion; fixed for the facade's lifetime
    placeholder: Value,
    state: Mutex<BuilderState>,
}

/// Chainable, awaitable stand-in for a query builder.
///
/// Clones are handles to the same facade.
#[derive(Clone)]
pub struct Facade {
    core: Arc<Core>,
}

/// Result of reading a member from a [`Facade`].
#[derive(Debug, Clone)]
pub enum Property {
    /// Execution entry point
    Then(ThenHook),
    /// Failure-branch entry point
    Catch(CatchHook),
    /// Inspection text, computed at read time
    Inspect(String),
    /// Terminal conversion member
    Convert(ConvertHook),
    /// Any other name
    Stub(CallStub),
}

impl Property {
    pub fn as_stub(&self) -> Option<&CallStub> {
        match self {
            Self::Stub(stub) => Some(stub),
            _ => None,
        }
    }

    pub fn into_stub(self) -> Option<CallStub> {
        match self {
            Self::Stub(stub) => Some(stub),
            _ => None,
        }
    }
}

impl Facade {
    pub(crate) fn new(config: BuilderConfig) -> Self {
        Self {
            core: Arc::new(Core {
                id: FacadeId::new(),
                config,
                placeholder: Value::Object(serde_json::Map::new()),
                state: Mutex::new(BuilderState::default()),
            }),
        }
    }

    /// Lock the shared state, recovering it if a previous holder panicked.
    pub(crate) fn lock_state(&self) -> MutexGuard<'_, BuilderState> {
        self.core
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn id(&self) -> FacadeId {
        self.core.id
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.core.config
    }

    /// Whether both handles refer to the same facade.
    pub fn same_as(&self, other: &Facade) -> bool {
        Arc::ptr_eq(&self.core, &other.core)
    }

    pub fn is_finalized(&self) -> bool {
        !self.lock_state().finalization.is_open()
    }

    pub fn finalized_by(&self) -> Option<FinalizedBy> {
        self.lock_state().finalization.finalized_by()
    }

    pub fn finalization_kind(&self) -> FinalizationKind {
        self.lock_state().finalization.kind()
    }

    /// Read a member.
    ///
    /// Reserved names always succeed. Any other name yields its stub,
    /// creating it on first access; creation is refused once the facade is
    /// finalized, but existing stubs stay readable.
    pub fn get(&self, name: &str) -> Result<Property> {
        let config = &self.core.config;
        if name == config.then_member {
            return Ok(Property::Then(ThenHook::new(self.clone())));
        }
        if name == config.catch_member {
            return Ok(Property::Catch(CatchHook::new(self.clone())));
        }
        if name == config.inspect_member {
            return Ok(Property::Inspect(self.inspect()));
        }
        if name == config.convert_member {
            return Ok(Property::Convert(ConvertHook::new(self.clone())));
        }
        self.stub_for(name).map(Property::Stub)
    }

    fn stub_for(&self, name: &str) -> Result<CallStub> {
        let mut state = self.lock_state();
        if !state.stubs.contains(name) {
            state.ensure_open_for(name)?;
            state.stubs.insert(name);
            debug!(facade = %self.core.id, method = name, "Created call stub");
        }
        Ok(CallStub::new(name, self.clone()))
    }

    /// Read `name` and invoke it with this facade as receiver.
    pub fn call(&self, name: &str, args: Vec<Value>) -> Result<Facade> {
        match self.get(name)? {
            Property::Stub(stub) => stub.call(self, args),
            _ => Err(Error::not_chainable(name)),
        }
    }

    /// Inspection text: the label followed by stub names in creation order.
    pub fn inspect(&self) -> String {
        let state = self.lock_state();
        format!(
            "{}({})",
            self.core.config.label,
            state.stubs.names().join(", ")
        )
    }

    /// Materialize the deferred computation, or return the existing one.
    ///
    /// A converted facade settles no outcome; awaiting it never completes.
    pub fn execute(&self) -> Execution {
        let mut state = self.lock_state();
        let BuilderState {
            outcome,
            finalization,
            ..
        } = &mut *state;

        match finalization.execute(outcome) {
            Some((execution, created)) => {
                if created {
                    debug!(
                        facade = %self.core.id,
                        outcome = %execution.kind(),
                        "Builder executed"
                    );
                }
                execution
            }
            None => {
                warn!(facade = %self.core.id, "Awaited a converted builder");
                Outcome::Unset.materialize()
            }
        }
    }

    /// Failure branch of [`Facade::execute`].
    pub fn catch(&self) -> impl std::future::Future<Output = Option<Value>> + Send + 'static {
        self.execute().catch()
    }

    /// Terminal conversion, invoked through `this`.
    ///
    /// Only allowed once, while open. Returns the facade's placeholder value.
    pub fn convert(&self, this: &Facade) -> Result<Value> {
        let member = self.core.config.convert_member.as_str();
        let mut state = self.lock_state();
        state.ensure_open_for(member)?;
        if !this.same_as(self) {
            return Err(Error::receiver_mismatch(member));
        }
        state.finalization.convert()?;
        debug!(facade = %self.core.id, member, "Builder converted");
        Ok(self.core.placeholder.clone())
    }

    /// The value returned by the terminal conversion.
    pub fn placeholder(&self) -> &Value {
        &self.core.placeholder
    }
}

impl IntoFuture for Facade {
    type Output = Settlement;
    type IntoFuture = Execution;

    fn into_future(self) -> Self::IntoFuture {
        self.execute()
    }
}

impl IntoFuture for &Facade {
    type Output = Settlement;
    type IntoFuture = Execution;

    fn into_future(self) -> Self::IntoFuture {
        self.execute()
    }
}

impl std::fmt::Display for Facade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inspect())
    }
}

impl std::fmt::Debug for Facade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Facade")
            .field("id", &self.core.id)
            .field("finalization", &self.finalization_kind())
            .finish()
    }
}

/// Handle for the execution member.
#[derive(Debug, Clone)]
pub struct ThenHook {
    facade: Facade,
}

impl ThenHook {
    fn new(facade: Facade) -> Self {
        Self { facade }
    }

    pub fn call(&self) -> Execution {
        self.facade.execute()
    }
}

/// Handle for the failure-branch member.
#[derive(Debug, Clone)]
pub struct CatchHook {
    facade: Facade,
}

impl CatchHook {
    fn new(facade: Facade) -> Self {
        Self { facade }
    }

    pub fn call(&self) -> impl std::future::Future<Output = Option<Value>> + Send + 'static {
        self.facade.catch()
    }
}

/// Handle for the terminal conversion member.
#[derive(Debug, Clone)]
pub struct ConvertHook {
    facade: Facade,
}

impl ConvertHook {
    fn new(facade: Facade) -> Self {
        Self { facade }
    }

    pub fn call(&self, this: &Facade) -> Result<Value> {
        self.facade.convert(this)
    }
}
