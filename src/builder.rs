//! The controller test code holds on to.
//!
//! A [`FakeBuilder`] owns one [`Facade`] for its whole lifetime. Tests
//! configure the outcome here, hand the facade to the code under test, and
//! read the recorded calls back afterwards.

use std::collections::HashMap;

use serde_json::Value;
use tracing::debug;

use crate::config::BuilderConfig;
use crate::error::Result;
use crate::facade::Facade;
use crate::finalization::FinalizationKind;
use crate::outcome::Outcome;
use crate::report::BuilderReport;
use crate::stub::{CallStub, LoggedCall};

/// Fake query builder controller.
#[derive(Debug)]
pub struct FakeBuilder {
    facade: Facade,
}

impl Default for FakeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeBuilder {
    /// Create an open builder with no stubs and no configured outcome.
    pub fn new() -> Self {
        Self {
            facade: Facade::new(BuilderConfig::default()),
        }
    }

    /// Create a builder with custom reserved member names.
    pub fn with_config(config: BuilderConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            facade: Facade::new(config),
        })
    }

    /// The facade to substitute for a real query builder.
    pub fn facade(&self) -> &Facade {
        &self.facade
    }

    /// Resolve with `value` when awaited. Last configuration wins.
    pub fn resolves(&self, value: impl Into<Value>) -> Result<&Self> {
        self.configure("resolves", Outcome::Success(value.into()))
    }

    /// Reject with `reason` when awaited. Last configuration wins.
    pub fn rejects(&self, reason: impl Into<Value>) -> Result<&Self> {
        self.configure("rejects", Outcome::Failure(reason.into()))
    }

    fn configure(&self, member: &str, outcome: Outcome) -> Result<&Self> {
        let mut state = self.facade.lock_state();
        state.ensure_open_for(member)?;
        debug!(facade = %self.facade.id(), outcome = %outcome.kind(), "Configured outcome");
        state.outcome = outcome;
        Ok(self)
    }

    /// Currently configured outcome.
    pub fn outcome(&self) -> Outcome {
        self.facade.lock_state().outcome.clone()
    }

    pub fn finalization(&self) -> FinalizationKind {
        self.facade.finalization_kind()
    }

    /// Names of every accessed method, in first-access order.
    #[deprecated(note = "assert on `stubs()` or `stub()` instead of relying on order across methods")]
    pub fn called_methods(&self) -> Vec<String> {
        self.facade.lock_state().stubs.names().to_vec()
    }

    /// Every stub keyed by method name.
    pub fn stubs(&self) -> HashMap<String, CallStub> {
        self.facade
            .lock_state()
            .stubs
            .names()
            .iter()
            .map(|name| (name.clone(), CallStub::new(name, self.facade.clone())))
            .collect()
    }

    /// Look up an existing stub without creating one.
    pub fn stub(&self, name: &str) -> Option<CallStub> {
        let exists = self.facade.lock_state().stubs.contains(name);
        exists.then(|| CallStub::new(name, self.facade.clone()))
    }

    /// All calls on this builder ordered by when they happened.
    pub fn call_log(&self) -> Vec<LoggedCall> {
        self.facade.lock_state().stubs.log()
    }

    /// Value returned by the terminal conversion member.
    pub fn native_placeholder(&self) -> Value {
        self.facade.placeholder().clone()
    }

    pub fn report(&self) -> BuilderReport {
        let state = self.facade.lock_state();
        BuilderReport::capture(&self.facade.config().label, self.facade.id(), &state)
    }
}

#[cfg(test)]
#[allow(deprecated)]
mod tests {
    use super::*;
    use crate::error::{Error, FinalizedBy};
    use crate::facade::Property;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn test_new_builder_is_empty_and_open() {
        let builder = FakeBuilder::new();
        assert!(builder.called_methods().is_empty());
        assert!(builder.stubs().is_empty());
        assert_eq!(builder.outcome(), Outcome::Unset);
        assert_eq!(builder.finalization(), FinalizationKind::Open);
        assert_eq!(builder.native_placeholder(), json!({}));
    }

    #[test]
    fn test_with_config_validates() {
        let config = BuilderConfig::new().with_then_member("catch");
        assert!(matches!(FakeBuilder::with_config(config), Err(Error::Config(_))));
    }

    #[test]
    fn test_configuration_is_chainable_and_last_write_wins() {
        let builder = FakeBuilder::new();
        builder
            .resolves(json!([1]))
            .unwrap()
            .rejects(json!("nope"))
            .unwrap()
            .resolves(json!([2]))
            .unwrap();

        assert_eq!(builder.outcome(), Outcome::Success(json!([2])));
    }

    #[tokio::test(start_paused = true)]
    async fn test_where_returning_unset_scenario() {
        let builder = FakeBuilder::new();
        let facade = builder.facade();

        facade
            .call("where", vec![json!("id"), json!(">"), json!(42)])
            .unwrap()
            .call("returning", vec![json!("*")])
            .unwrap();

        let execution = facade.execute();
        let waited = tokio::time::timeout(Duration::from_secs(10), execution.clone()).await;
        assert!(waited.is_err());
        assert!(!execution.is_settled());

        assert_eq!(builder.called_methods(), vec!["where", "returning"]);
        let where_stub = builder.stub("where").unwrap();
        assert_eq!(where_stub.call_count(), 1);
        assert_eq!(
            where_stub.args(),
            vec![vec![json!("id"), json!(">"), json!(42)]]
        );

        let err = builder.resolves(json!([])).unwrap_err();
        assert_eq!(err.finalized_by(), Some(FinalizedBy::Executed));
    }

    #[tokio::test]
    async fn test_resolves_delete_scenario() {
        let builder = FakeBuilder::new();
        builder.resolves(json!([])).unwrap();
        let facade = builder.facade();

        let result = facade.call("delete", vec![]).unwrap().await;
        assert_eq!(result, Ok(json!([])));

        let delete = builder.stub("delete").unwrap();
        assert_eq!(delete.call_count(), 1);
        assert_eq!(delete.args(), vec![Vec::<Value>::new()]);

        let err = builder.rejects(json!("late")).unwrap_err();
        assert!(err.is_already_finalized());
        assert_eq!(err.to_string(), "FakeBuilder cannot be changed once executed");
    }

    #[tokio::test]
    async fn test_rejection_propagates_reason() {
        let builder = FakeBuilder::new();
        let reason = json!({"name": "QueryError", "detail": "relation does not exist"});
        builder.rejects(reason.clone()).unwrap();

        let facade = builder.facade().call("from", vec![json!("ghosts")]).unwrap();
        assert_eq!(facade.await, Err(reason));
    }

    #[tokio::test]
    async fn test_settlement_fixed_at_first_execution() {
        let builder = FakeBuilder::new();
        builder.resolves(json!("first")).unwrap();
        let execution = builder.facade().execute();

        assert!(builder.resolves(json!("second")).is_err());
        assert_eq!(builder.outcome(), Outcome::Success(json!("first")));
        assert_eq!(execution.await, Ok(json!("first")));
        assert_eq!(builder.facade().await, Ok(json!("first")));
    }

    #[tokio::test]
    async fn test_everything_fails_after_execution() {
        let builder = FakeBuilder::new();
        let facade = builder.facade();
        let stub = facade.get("where").unwrap().into_stub().unwrap();
        builder.resolves(Value::Null).unwrap();
        assert_eq!(facade.await, Ok(Value::Null));

        for err in [
            stub.call(facade, vec![]).unwrap_err(),
            builder.resolves(json!(1)).map(|_| ()).unwrap_err(),
            builder.rejects(json!(1)).map(|_| ()).unwrap_err(),
            facade.convert(facade).unwrap_err(),
        ] {
            assert_eq!(err.finalized_by(), Some(FinalizedBy::Executed));
        }
        assert!(!stub.was_called());
    }

    #[test]
    fn test_everything_fails_after_conversion() {
        let builder = FakeBuilder::new();
        let facade = builder.facade();
        facade.call("select", vec![json!("id")]).unwrap();

        let native = match facade.get("toSQL").unwrap() {
            Property::Convert(hook) => hook.call(facade).unwrap(),
            other => panic!("unexpected property: {:?}", other),
        };
        assert_eq!(native, builder.native_placeholder());

        let stub = builder.stub("select").unwrap();
        for err in [
            stub.call(facade, vec![]).unwrap_err(),
            facade.convert(facade).unwrap_err(),
            builder.rejects(json!("x")).map(|_| ()).unwrap_err(),
        ] {
            assert_eq!(err.to_string(), "FakeBuilder cannot be changed once converted");
        }
        assert_eq!(stub.call_count(), 1);
        assert_eq!(builder.native_placeholder(), native);
        assert_eq!(builder.finalization(), FinalizationKind::Converted);
    }

    #[test]
    fn test_stub_lookup_does_not_create() {
        let builder = FakeBuilder::new();
        assert!(builder.stub("where").is_none());
        assert!(builder.stubs().is_empty());

        builder.facade().get("where").unwrap();
        let stubs = builder.stubs();
        assert_eq!(stubs.len(), 1);
        assert!(stubs["where"].ptr_eq(&builder.stub("where").unwrap()));
    }

    #[test]
    fn test_call_log_orders_across_methods() {
        let builder = FakeBuilder::new();
        let facade = builder.facade();
        facade.call("select", vec![json!("a")]).unwrap();
        facade.call("where", vec![json!("b")]).unwrap();
        facade.call("select", vec![json!("c")]).unwrap();

        let log: Vec<(String, Vec<Value>)> = builder
            .call_log()
            .into_iter()
            .map(|entry| (entry.method, entry.record.args))
            .collect();
        assert_eq!(
            log,
            vec![
                ("select".to_string(), vec![json!("a")]),
                ("where".to_string(), vec![json!("b")]),
                ("select".to_string(), vec![json!("c")]),
            ]
        );
    }

    #[tokio::test]
    async fn test_facade_moves_into_spawned_task() {
        let builder = FakeBuilder::new();
        builder.resolves(json!(5)).unwrap();
        let facade = builder.facade().clone();

        let handle = tokio::spawn(async move {
            facade.call("count", vec![json!("*")]).unwrap().await
        });
        assert_eq!(handle.await.unwrap(), Ok(json!(5)));
        assert!(builder.stub("count").unwrap().was_called());
    }
}
