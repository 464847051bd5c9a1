//! Configured outcomes and the deferred computation they settle into.
//!
//! An [`Outcome`] is what the test told the builder to produce. It is turned
//! into an [`Execution`] exactly once, the first time the builder is awaited;
//! every later await observes that same shared computation.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::future::{self, BoxFuture, FutureExt, Shared};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Settled result of awaiting a builder: `Ok(value)` or `Err(reason)`.
pub type Settlement = std::result::Result<Value, Value>;

/// Result state configured on a builder.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Outcome {
    /// Nothing configured; awaiting never settles
    #[default]
    Unset,
    /// Awaiting resolves with this value
    Success(Value),
    /// Awaiting rejects with this reason
    Failure(Value),
}

impl Outcome {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Self::Unset => OutcomeKind::Unset,
            Self::Success(_) => OutcomeKind::Success,
            Self::Failure(_) => OutcomeKind::Failure,
        }
    }

    /// Create the deferred computation for this outcome.
    ///
    /// The settlement is captured by value, so later changes to the outcome
    /// cannot affect a computation that already exists.
    pub fn materialize(&self) -> Execution {
        let inner: BoxFuture<'static, Settlement> = match self {
            Self::Unset => future::pending().boxed(),
            Self::Success(value) => future::ready(Ok(value.clone())).boxed(),
            Self::Failure(reason) => future::ready(Err(reason.clone())).boxed(),
        };
        Execution {
            inner: inner.shared(),
            kind: self.kind(),
        }
    }
}

/// Discriminant of an [`Outcome`], used in logs and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Unset,
    Success,
    Failure,
}

impl std::fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Unset => "unset",
            Self::Success => "success",
            Self::Failure => "failure",
        };
        write!(f, "{}", s)
    }
}

/// The deferred computation behind an awaited builder.
///
/// Cloning is cheap and every clone observes the same settlement.
#[derive(Clone)]
pub struct Execution {
    inner: Shared<BoxFuture<'static, Settlement>>,
    kind: OutcomeKind,
}

impl Execution {
    /// The outcome this computation was created from.
    pub fn kind(&self) -> OutcomeKind {
        self.kind
    }

    /// Settlement, if one has already been observed by a poll.
    pub fn peek(&self) -> Option<&Settlement> {
        self.inner.peek()
    }

    pub fn is_settled(&self) -> bool {
        self.peek().is_some()
    }

    /// Whether both handles refer to the same computation.
    pub fn same_as(&self, other: &Execution) -> bool {
        self.inner.ptr_eq(&other.inner)
    }

    /// Failure branch only: resolves to `Some(reason)` on rejection and
    /// `None` when the computation resolves successfully.
    pub fn catch(&self) -> impl Future<Output = Option<Value>> + Send + 'static {
        self.clone().map(|settlement| settlement.err())
    }
}

impl Future for Execution {
    type Output = Settlement;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.inner).poll(cx)
    }
}

impl std::fmt::Debug for Execution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Execution")
            .field("kind", &self.kind)
            .field("settlement", &self.peek())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    #[tokio::test]
    async fn test_success_resolves_with_value() {
        let execution = Outcome::Success(json!([1, 2])).materialize();
        assert_eq!(execution.kind(), OutcomeKind::Success);
        assert_eq!(execution.await, Ok(json!([1, 2])));
    }

    #[tokio::test]
    async fn test_failure_rejects_with_reason_unmodified() {
        let reason = json!({"code": "23505", "message": "duplicate key"});
        let execution = Outcome::Failure(reason.clone()).materialize();
        assert_eq!(execution.await, Err(reason));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unset_never_settles() {
        let execution = Outcome::Unset.materialize();
        let waited = tokio::time::timeout(Duration::from_secs(5), execution.clone()).await;
        assert!(waited.is_err());
        assert!(!execution.is_settled());
    }

    #[tokio::test]
    async fn test_clones_share_one_settlement() {
        let execution = Outcome::Success(json!("done")).materialize();
        let other = execution.clone();
        assert!(execution.same_as(&other));
        assert!(!execution.is_settled());

        assert_eq!(other.await, Ok(json!("done")));
        assert_eq!(execution.peek(), Some(&Ok(json!("done"))));
    }

    #[tokio::test]
    async fn test_separate_materializations_are_distinct() {
        let outcome = Outcome::Success(Value::Null);
        assert!(!outcome.materialize().same_as(&outcome.materialize()));
    }

    #[tokio::test]
    async fn test_catch_surfaces_failure_only() {
        let failed = Outcome::Failure(json!("boom")).materialize();
        assert_eq!(failed.catch().await, Some(json!("boom")));

        let ok = Outcome::Success(json!(1)).materialize();
        assert_eq!(ok.catch().await, None);
    }

    #[test]
    fn test_outcome_kind_display() {
        assert_eq!(Outcome::default().kind().to_string(), "unset");
        assert_eq!(Outcome::Failure(Value::Null).kind().to_string(), "failure");
    }
}
