//! Agent node trait definition

use crate::error::{FetchError, NodeFault};
use crate::model::{Analysis, Payload, QualityVerdict, Report, ResearchTask, SourceKey};
use crate::state::AnalysisState;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// The five agent roles of a research run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Planner,
    Fetcher,
    Analyst,
    Writer,
    Checker,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Planner => "planner",
            Stage::Fetcher => "fetcher",
            Stage::Analyst => "analyst",
            Stage::Writer => "writer",
            Stage::Checker => "checker",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of one node invocation
///
/// Nodes never mutate the state directly. The controller applies the delta,
/// which keeps a single writer per run.
#[derive(Debug, Clone, PartialEq)]
pub enum StateDelta {
    /// Ordered research tasks (planner)
    Plan(Vec<ResearchTask>),
    /// One entry per attempted source (fetcher)
    RawData(Vec<(SourceKey, Result<Payload, FetchError>)>),
    /// Structured findings (analyst)
    Analysis(Analysis),
    /// Draft report (writer)
    Report(Report),
    /// Quality verdict (checker)
    Verdict(QualityVerdict),
}

impl StateDelta {
    /// Stage allowed to emit this delta
    pub fn stage(&self) -> Stage {
        match self {
            StateDelta::Plan(_) => Stage::Planner,
            StateDelta::RawData(_) => Stage::Fetcher,
            StateDelta::Analysis(_) => Stage::Analyst,
            StateDelta::Report(_) => Stage::Writer,
            StateDelta::Verdict(_) => Stage::Checker,
        }
    }
}

/// Per-invocation context handed to every node
#[derive(Debug, Clone)]
pub struct NodeContext {
    /// Minimum passing score on the 0-10 scale
    pub quality_threshold: f32,
    /// Fires when the run's wall-clock budget is exhausted
    pub cancel: CancellationToken,
    /// Absolute run deadline
    pub deadline: Instant,
    /// Current revision iteration, starting at 0
    pub iteration: u32,
}

impl NodeContext {
    pub fn new(
        quality_threshold: f32,
        cancel: CancellationToken,
        deadline: Instant,
        iteration: u32,
    ) -> Self {
        Self {
            quality_threshold,
            cancel,
            deadline,
            iteration,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Time left until the run deadline (zero once passed)
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }
}

/// Core trait that every agent node implements
///
/// A node reads the current state and returns the delta for its stage, or a
/// classified fault. Nodes must be safe to invoke again with identical input,
/// since the controller retries retryable faults once.
#[async_trait]
pub trait AgentNode: Send + Sync {
    /// The stage this node fills
    fn stage(&self) -> Stage;

    /// Compute this node's contribution from the current state
    async fn transform(
        &self,
        state: &AnalysisState,
        ctx: &NodeContext,
    ) -> Result<StateDelta, NodeFault>;
}
