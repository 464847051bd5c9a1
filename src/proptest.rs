//! Property-based tests for call tracking and finalization using proptest.
//!
//! These tests check the invariants that hold for any sequence of calls:
//!
//! - Each method name gets exactly one stub, created on first access
//! - Call counts and argument lists match what was passed, in order
//! - Once executed, no further call or configuration is accepted
