//! Workflow controller
//!
//! Runs one research pass as an explicit state machine:
//!
//! ```text
//! Plan -> Fetch -> Analyze -> Write -> Check -+-> Done
//!                     ^          ^            |
//!                     +----------+-- Revise --+-> Failed
//! ```
//!
//! The controller is the only writer of the [`AnalysisState`]. Each node gets
//! a shared reference and hands back a delta, which the controller applies.
//! Planner and Fetcher run once; revision passes re-use the fetched data.

use crate::config::{ConfigError, RevisionPolicy, WorkflowConfig};
use crate::gate::{self, GateDecision};
use analyst_core::{
    AgentNode, AnalysisState, FaultKind, NodeContext, NodeFault, Stage, StateDelta,
    TerminalReason, Ticker,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Controller states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Plan,
    Fetch,
    Analyze,
    Write,
    Check,
    Done,
    Failed,
}

impl Phase {
    /// Node stage run in this phase, `None` once terminal
    pub fn stage(self) -> Option<Stage> {
        match self {
            Phase::Plan => Some(Stage::Planner),
            Phase::Fetch => Some(Stage::Fetcher),
            Phase::Analyze => Some(Stage::Analyst),
            Phase::Write => Some(Stage::Writer),
            Phase::Check => Some(Stage::Checker),
            Phase::Done | Phase::Failed => None,
        }
    }
}

/// The five nodes of a run, one slot per stage
#[derive(Clone)]
pub struct NodeSet {
    pub planner: Arc<dyn AgentNode>,
    pub fetcher: Arc<dyn AgentNode>,
    pub analyst: Arc<dyn AgentNode>,
    pub writer: Arc<dyn AgentNode>,
    pub checker: Arc<dyn AgentNode>,
}

impl NodeSet {
    pub fn new(
        planner: Arc<dyn AgentNode>,
        fetcher: Arc<dyn AgentNode>,
        analyst: Arc<dyn AgentNode>,
        writer: Arc<dyn AgentNode>,
        checker: Arc<dyn AgentNode>,
    ) -> Self {
        Self {
            planner,
            fetcher,
            analyst,
            writer,
            checker,
        }
    }

    fn node(&self, stage: Stage) -> &dyn AgentNode {
        match stage {
            Stage::Planner => self.planner.as_ref(),
            Stage::Fetcher => self.fetcher.as_ref(),
            Stage::Analyst => self.analyst.as_ref(),
            Stage::Writer => self.writer.as_ref(),
            Stage::Checker => self.checker.as_ref(),
        }
    }
}

/// Result of a run: the final state and why it ended
#[derive(Debug)]
pub struct RunOutcome {
    pub state: AnalysisState,
    pub reason: TerminalReason,
    /// The fault behind a fatal reason
    pub fault: Option<NodeFault>,
}

impl RunOutcome {
    pub fn is_fatal(&self) -> bool {
        self.reason.is_fatal()
    }
}

/// Stand-in for deadlines too far out to represent (about 30 years)
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// `start + after`, saturating to a far-future instant
fn instant_after(start: Instant, after: Duration) -> Instant {
    start
        .checked_add(after)
        .or_else(|| start.checked_add(FAR_FUTURE))
        .unwrap_or(start)
}

enum Step {
    Next(Phase),
    End(TerminalReason, Option<NodeFault>),
}

/// Cancels the run token at the deadline; aborted when the run returns
struct Watchdog(JoinHandle<()>);

impl Watchdog {
    fn spawn(token: CancellationToken, deadline: Instant) -> Self {
        Self(tokio::spawn(async move {
            tokio::select! {
                () = tokio::time::sleep_until(deadline) => {
                    warn!("Run deadline reached, cancelling outstanding work");
                    token.cancel();
                }
                () = token.cancelled() => {}
            }
        }))
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Drives the node set through the research workflow
pub struct WorkflowController {
    nodes: NodeSet,
    config: WorkflowConfig,
}

impl WorkflowController {
    pub fn new(nodes: NodeSet, config: WorkflowConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { nodes, config })
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// Run the workflow for a ticker until it passes, exhausts its
    /// iterations, fails, or times out
    pub async fn run(&self, ticker: Ticker) -> RunOutcome {
        self.run_with_cancel(ticker, CancellationToken::new()).await
    }

    /// [`run`](Self::run) with an external cancellation signal, treated like
    /// the deadline
    #[instrument(skip(self, cancel), fields(ticker = %ticker))]
    pub async fn run_with_cancel(&self, ticker: Ticker, cancel: CancellationToken) -> RunOutcome {
        let deadline = instant_after(Instant::now(), self.config.timeout);
        let token = cancel.child_token();
        let _watchdog = Watchdog::spawn(token.clone(), deadline);

        let mut state = AnalysisState::new(ticker);
        info!(
            run_id = %state.run_id(),
            max_iterations = self.config.max_iterations,
            quality_threshold = self.config.quality_threshold,
            timeout_secs = self.config.timeout.as_secs(),
            "Research run started"
        );

        let mut phase = Phase::Plan;
        let mut reason = TerminalReason::FatalError(FaultKind::Internal);
        let mut fault = None;

        while let Some(stage) = phase.stage() {
            info!(%stage, iteration = state.iteration(), "Entering phase");
            let ctx = NodeContext::new(
                self.config.quality_threshold,
                token.clone(),
                deadline,
                state.iteration(),
            );
            let stalled = state.stalled_revisions();

            let applied = match self.invoke(stage, &state, &ctx).await {
                Ok(delta) => state
                    .apply(delta)
                    .map_err(|e| NodeFault::new(stage, e.fault_kind(), e.to_string())),
                Err(fault) => Err(fault),
            };

            let step = match applied {
                Ok(()) => {
                    if state.stalled_revisions() > stalled {
                        warn!(
                            iteration = state.iteration(),
                            deficiencies = state.quality().map_or(0, |q| q.deficiencies.len()),
                            "Revision did not reduce the deficiency list"
                        );
                    }
                    self.next_phase(phase, &mut state, &token)
                }
                Err(fault) => Self::on_fault(fault, &state, &token),
            };

            match step {
                Step::Next(next) => phase = next,
                Step::End(end, cause) => {
                    phase = if end.is_fatal() {
                        Phase::Failed
                    } else {
                        Phase::Done
                    };
                    reason = end;
                    fault = cause;
                }
            }
        }

        match state.rollback_revision() {
            Ok(true) => warn!(
                iteration = state.iteration(),
                "Revision ended before its checker pass, keeping the last checked report"
            ),
            Ok(false) => {}
            Err(error) => warn!(%error, "Could not roll back the unfinished revision"),
        }
        if let Err(error) = state.finish(reason) {
            warn!(%error, "Terminal reason was already set");
        }
        info!(
            %reason,
            iterations = state.iteration() + 1,
            checker_passes = state.checker_passes(),
            stalled_revisions = state.stalled_revisions(),
            "Research run finished"
        );

        RunOutcome {
            state,
            reason,
            fault,
        }
    }

    /// Run a node, retrying a retryable fault once with identical input
    async fn invoke(
        &self,
        stage: Stage,
        state: &AnalysisState,
        ctx: &NodeContext,
    ) -> Result<StateDelta, NodeFault> {
        match self.attempt(stage, state, ctx).await {
            Err(fault) if fault.is_retryable() && !ctx.is_cancelled() => {
                warn!(%fault, "Node fault, retrying once");
                self.attempt(stage, state, ctx).await
            }
            outcome => outcome,
        }
    }

    async fn attempt(
        &self,
        stage: Stage,
        state: &AnalysisState,
        ctx: &NodeContext,
    ) -> Result<StateDelta, NodeFault> {
        let node = self.nodes.node(stage);
        if node.stage() != stage {
            return Err(NodeFault::internal(
                stage,
                format!("{} node registered in the {stage} slot", node.stage()),
            ));
        }

        let cutoff = instant_after(ctx.deadline, self.config.node_grace);
        let delta = tokio::time::timeout_at(cutoff, node.transform(state, ctx))
            .await
            .map_err(|_| {
                NodeFault::new(
                    stage,
                    FaultKind::Timeout,
                    format!(
                        "still running {}s past the run deadline",
                        self.config.node_grace.as_secs()
                    ),
                )
            })??;

        if delta.stage() != stage {
            return Err(NodeFault::internal(
                stage,
                format!("returned a {} delta", delta.stage()),
            ));
        }
        debug!(%stage, "Node produced delta");
        Ok(delta)
    }

    fn next_phase(&self, phase: Phase, state: &mut AnalysisState, token: &CancellationToken) -> Step {
        match phase {
            Phase::Plan => Step::Next(Phase::Fetch),
            Phase::Fetch => Step::Next(Phase::Analyze),
            Phase::Analyze => Step::Next(Phase::Write),
            Phase::Write => Step::Next(Phase::Check),
            Phase::Check => self.after_check(state, token),
            Phase::Done | Phase::Failed => Step::Next(phase),
        }
    }

    fn after_check(&self, state: &mut AnalysisState, token: &CancellationToken) -> Step {
        let decision = gate::decide_opt(
            state.quality(),
            state.iteration(),
            self.config.max_iterations,
        );
        if let Some(verdict) = state.quality() {
            info!(
                score = %verdict.score,
                passed = verdict.passed,
                deficiencies = verdict.deficiencies.len(),
                ?decision,
                "Quality gate decision"
            );
        }

        match decision {
            GateDecision::Stop(reason) => Step::End(reason.into(), None),
            GateDecision::Continue => Step::End(
                TerminalReason::FatalError(FaultKind::Internal),
                Some(NodeFault::internal(Stage::Checker, "checker pass left no verdict")),
            ),
            GateDecision::Revise if token.is_cancelled() => {
                warn!("Run deadline passed at a revision boundary, keeping the current report");
                Step::End(TerminalReason::TimedOut, None)
            }
            GateDecision::Revise => {
                let presentation_only = state.quality().is_some_and(|q| q.presentation_only());
                if let Err(error) = state.advance_iteration() {
                    return Step::End(
                        TerminalReason::FatalError(error.fault_kind()),
                        Some(NodeFault::new(Stage::Checker, error.fault_kind(), error.to_string())),
                    );
                }

                let reenter = match self.config.revision_policy {
                    RevisionPolicy::Targeted if presentation_only => Phase::Write,
                    _ => Phase::Analyze,
                };
                info!(iteration = state.iteration(), ?reenter, "Starting revision pass");
                Step::Next(reenter)
            }
        }
    }

    /// Classify a fault that survived its retry
    fn on_fault(fault: NodeFault, state: &AnalysisState, token: &CancellationToken) -> Step {
        let interrupted = fault.kind.is_interruption() || (fault.is_retryable() && token.is_cancelled());

        if interrupted && state.report().is_some() {
            warn!(%fault, "Run interrupted, returning the latest report");
            Step::End(TerminalReason::TimedOut, None)
        } else if interrupted {
            warn!(%fault, "Run interrupted before any report was written");
            Step::End(
                TerminalReason::FatalError(FaultKind::Timeout),
                Some(NodeFault::new(fault.stage, FaultKind::Timeout, fault.message)),
            )
        } else {
            warn!(%fault, "Fatal node fault");
            Step::End(TerminalReason::FatalError(fault.kind), Some(fault))
        }
    }
}
