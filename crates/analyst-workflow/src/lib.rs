//! Research workflow orchestration for analyst-rs
//!
//! The [`WorkflowController`] threads an [`AnalysisState`] through the five
//! agent nodes, consults the quality [`gate`] after every checker pass, and
//! bounds the run by iteration count and wall-clock deadline.
//!
//! [`AnalysisState`]: analyst_core::AnalysisState

pub mod config;
pub mod controller;
pub mod gate;

pub use config::{ConfigError, RevisionPolicy, WorkflowConfig, WorkflowConfigBuilder};
pub use controller::{NodeSet, Phase, RunOutcome, WorkflowController};
pub use gate::{decide, decide_opt, GateDecision, StopReason};
