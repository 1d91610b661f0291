//! Testing utilities and mock implementations
//!
//! Mocks for the two external APIs let the HTTP layer be tested without
//! reaching Google.

pub mod mocks;

pub use mocks::*;
