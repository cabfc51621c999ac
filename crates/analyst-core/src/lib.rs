//! Core abstractions for analyst-rs
//!
//! This crate defines the analysis state threaded through a research run, the
//! [`AgentNode`] trait every stage implements, and the fault taxonomy the
//! workflow controller classifies.

pub mod error;
pub mod model;
pub mod node;
pub mod state;
pub mod ticker;

pub use error::{FaultKind, FetchError, NodeFault, Result, StateError};
pub use model::{
    Analysis, DataKind, Deficiency, DeficiencyCategory, FetchRecord, Finding, Payload,
    QualityScore, QualityVerdict, Recommendation, Report, ReportSection, ResearchTask,
    SourceKey, TerminalReason,
};
pub use node::{AgentNode, NodeContext, Stage, StateDelta};
pub use state::AnalysisState;
pub use ticker::{Market, Ticker};
