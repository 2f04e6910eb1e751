//! Test doubles shared by this crate's tests and downstream integration tests
//!
//! Enabled for `cfg(test)` and by the `test-utils` feature.

pub mod mocks;
