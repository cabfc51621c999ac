//! Research entry point: wires the nodes into a workflow run

use crate::analyst::AnalystNode;
use crate::checker::CheckerNode;
use crate::config::AgentConfig;
use crate::error::{ResearchError, Result};
use crate::fetcher::FetcherNode;
use crate::llm::LlmClient;
use crate::planner::PlannerNode;
use crate::report::ResearchReport;
use crate::writer::WriterNode;
use analyst_core::{FaultKind, Market, TerminalReason};
use analyst_data::{Gateway, GatewayConfig};
use analyst_llm::providers::AnthropicProvider;
use analyst_llm::LLMProvider;
use analyst_workflow::{NodeSet, RevisionPolicy, WorkflowConfig, WorkflowController};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

/// Per-run options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchOptions {
    pub max_iterations: u32,
    pub quality_threshold: f32,
    pub timeout: Duration,
    /// Market for symbols without an exchange suffix; the gateway default
    /// applies when unset
    pub market: Option<Market>,
    pub revision_policy: RevisionPolicy,
}

impl Default for ResearchOptions {
    fn default() -> Self {
        let workflow = WorkflowConfig::default();
        Self {
            max_iterations: workflow.max_iterations,
            quality_threshold: workflow.quality_threshold,
            timeout: workflow.timeout,
            market: None,
            revision_policy: workflow.revision_policy,
        }
    }
}

impl ResearchOptions {
    fn workflow_config(&self) -> Result<WorkflowConfig> {
        Ok(WorkflowConfig::builder()
            .max_iterations(self.max_iterations)
            .quality_threshold(self.quality_threshold)
            .timeout(self.timeout)
            .revision_policy(self.revision_policy)
            .build()?)
    }
}

/// Produces equity research reports
///
/// Holds the collaborators shared across runs: the LLM client, the data
/// gateway with its cache and rate limiters, and the node configuration.
/// Each call to [`research`](Self::research) owns a fresh analysis state.
pub struct EquityResearcher {
    llm: LlmClient,
    gateway: Arc<Gateway>,
    config: Arc<AgentConfig>,
}

impl EquityResearcher {
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        gateway: Arc<Gateway>,
        config: AgentConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            llm: LlmClient::new(provider, config.model.clone()),
            gateway,
            config: Arc::new(config),
        })
    }

    /// Anthropic backend and every data provider configured in the
    /// environment
    pub fn from_env(config: AgentConfig, gateway_config: GatewayConfig) -> Result<Self> {
        let provider = AnthropicProvider::from_env()?;
        let gateway = Gateway::from_env(gateway_config)?;
        info!(
            model = %config.model,
            providers = ?gateway.provider_names(),
            "Research backends ready"
        );
        Self::new(Arc::new(provider), Arc::new(gateway), config)
    }

    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    /// One node per stage, sharing this researcher's collaborators
    pub fn nodes(&self) -> NodeSet {
        NodeSet::new(
            Arc::new(PlannerNode::new(self.llm.clone(), Arc::clone(&self.config))),
            Arc::new(FetcherNode::new(Arc::clone(&self.gateway))),
            Arc::new(AnalystNode::new(self.llm.clone(), Arc::clone(&self.config))),
            Arc::new(WriterNode::new(self.llm.clone(), Arc::clone(&self.config))),
            Arc::new(CheckerNode::new(self.llm.clone(), Arc::clone(&self.config))),
        )
    }

    /// Research a ticker until the report passes review or a budget runs out
    pub async fn research(&self, ticker: &str, options: ResearchOptions) -> Result<ResearchReport> {
        self.research_with_cancel(ticker, options, CancellationToken::new())
            .await
    }

    /// [`research`](Self::research) with an external cancellation signal
    #[instrument(skip(self, options, cancel))]
    pub async fn research_with_cancel(
        &self,
        ticker: &str,
        options: ResearchOptions,
        cancel: CancellationToken,
    ) -> Result<ResearchReport> {
        let market = options
            .market
            .unwrap_or(self.gateway.config().default_market);
        let ticker = analyst_data::normalize(ticker, market)?;
        let controller = WorkflowController::new(self.nodes(), options.workflow_config()?)?;

        let outcome = controller.run_with_cancel(ticker, cancel).await;
        let state = outcome.state;

        if let TerminalReason::FatalError(kind) = outcome.reason {
            let message = outcome
                .fault
                .map_or_else(|| format!("run ended with {kind}"), |fault| fault.to_string());
            warn!(%kind, %message, "Research run failed");
            return Err(ResearchError::Fatal {
                kind,
                message,
                state: Box::new(state),
            });
        }

        let report = ResearchReport::from_state(&state, outcome.reason).ok_or_else(|| {
            ResearchError::Fatal {
                kind: FaultKind::Internal,
                message: format!("run ended with {} but no report", outcome.reason),
                state: Box::new(state),
            }
        })?;
        info!(
            recommendation = %report.recommendation,
            iterations = report.iterations,
            outcome = %report.terminal_reason,
            "Research completed"
        );
        Ok(report)
    }
}
