//! Verification integration tests.
//!
//! - Invariant tests: `InvariantChecker` implementations hold across realistic play
//! - Property tests: random operation sequences checked with proptest

mod common;

mod verification {
    pub mod invariants;
    pub mod property;
}
