//! Shared utilities for analyst-rs
//!
//! Currently the tracing setup used by the `analyst` binary.

pub mod logging;

pub use logging::{init_tracing, LogFormat};
