//! Builder API for ergonomic machine construction.
//!
//! This module provides a fluent builder and macros for declaring machine
//! types with minimal boilerplate: rules and hooks are plain data handed to
//! the one generic engine.

pub mod error;
pub mod machine;
pub mod macros;

pub use error::BuildError;
pub use machine::MachineBuilder;
