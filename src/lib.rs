//! Kiln - compiler bridge cache
//!
//! Provides the compiled compiler bridge for a given compiler and runtime,
//! building it from published sources the first time it is needed and
//! serving every later request from a shared, concurrency-safe store.

pub mod bridge;
pub mod cache;
pub mod cli;
pub mod compile;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod metadata;
pub mod resolve;
pub mod runtime;

pub use error::{KilnError, KilnResult};
