//! # fake-query-builder
//!
//! A test double for chainable, awaitable query builders of the kind fluent
//! ORM APIs return.
//!
//! Hand the [`Facade`] of a [`FakeBuilder`] to the code under test in place of
//! a real builder. Any member it reads becomes a [`CallStub`] that records its
//! arguments and returns the facade, so arbitrary chains work without
//! declaring methods up front. Awaiting the facade settles with whatever the
//! test configured, and from then on the builder is frozen.
//!
//! ## Core Components
//!
//! - **Facade**: member dispatch, reserved members, `IntoFuture`
//! - **CallStub**: per-method call tracking
//! - **Outcome / Execution**: configured result and the shared deferred computation
//! - **Finalization**: the open → executed | converted state machine
//! - **FakeBuilder**: configuration and introspection for test code
//!
//! ## Example
//!
//! ```rust,ignore
//! use fake_query_builder::FakeBuilder;
//! use serde_json::json;
//!
//! let builder = FakeBuilder::new();
//! builder.resolves(json!([]))?;
//!
//! let rows = builder
//!     .facade()
//!     .call("where", vec![json!("id"), json!(42)])?
//!     .call("delete", vec![])?
//!     .await;
//!
//! assert_eq!(rows, Ok(json!([])));
//! assert!(builder.stub("where").unwrap().called_with(&[json!("id"), json!(42)]));
//! ```

pub mod builder;
pub mod config;
pub mod error;
pub mod facade;
pub mod finalization;
pub mod outcome;
pub mod report;
pub mod stub;

mod proptest;

// Re-exports for convenience
pub use builder::FakeBuilder;
pub use config::BuilderConfig;
pub use error::{Error, FinalizedBy, Result};
pub use facade::{CatchHook, ConvertHook, Facade, FacadeId, Property, ThenHook};
pub use finalization::{Finalization, FinalizationKind};
pub use outcome::{Execution, Outcome, OutcomeKind, Settlement};
pub use report::{BuilderReport, StubReport};
pub use stub::{CallRecord, CallStub, LoggedCall};
