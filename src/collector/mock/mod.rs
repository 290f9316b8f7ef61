//! Mock filesystem implementations for testing.
//!
//! This module provides `MockFs` and pre-built host scenarios for testing
//! the counter reader without access to a real Linux `/proc` and `/sys`.

mod filesystem;
mod scenarios;

pub use filesystem::{MockFs, MockInterface};
