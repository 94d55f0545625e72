//! Helper utilities for integration tests.

pub mod engines;
pub mod fixtures;

pub use engines::*;
pub use fixtures::*;
