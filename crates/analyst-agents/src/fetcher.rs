//! Fetcher node: gathers raw data for every kind in the plan

use analyst_core::{AgentNode, AnalysisState, NodeContext, NodeFault, Stage, StateDelta};
use analyst_data::{DataCoverage, Gateway};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Runs the plan's data requests through the gateway
///
/// Partial failure is normal and recorded per source. The node only faults
/// when every source failed for reasons other than the run budget.
pub struct FetcherNode {
    gateway: Arc<Gateway>,
}

impl FetcherNode {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl AgentNode for FetcherNode {
    fn stage(&self) -> Stage {
        Stage::Fetcher
    }

    #[instrument(skip_all, fields(ticker = %state.ticker()))]
    async fn transform(
        &self,
        state: &AnalysisState,
        ctx: &NodeContext,
    ) -> Result<StateDelta, NodeFault> {
        let Some(plan) = state.plan() else {
            return Err(NodeFault::internal(Stage::Fetcher, "no research plan"));
        };
        let kinds: Vec<_> = plan.iter().map(|task| task.kind).collect();

        let result = self
            .gateway
            .fetch_all(state.ticker(), &kinds, &ctx.cancel)
            .await;
        let coverage = DataCoverage::assess(
            result
                .entries()
                .iter()
                .filter_map(|(_, outcome)| outcome.as_ref().ok()),
        );
        info!(
            succeeded = result.succeeded(),
            failed = result.failed(),
            coverage = coverage.score,
            "Fetch completed"
        );
        if !coverage.issues.is_empty() {
            warn!(status = %coverage.status, issues = ?coverage.issues, "Fetched data has gaps");
        }

        let all_failed = !result.is_empty()
            && result
                .entries()
                .iter()
                .all(|(_, outcome)| outcome.as_ref().is_err_and(|e| !e.is_interruption()));
        if all_failed {
            return Err(NodeFault::no_data(
                Stage::Fetcher,
                format!("all {} data sources failed", result.len()),
            ));
        }

        Ok(StateDelta::RawData(result.into_entries()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{context, state, StaticProvider};
    use analyst_core::{DataKind, FaultKind, FetchError, ResearchTask};
    use analyst_data::GatewayConfig;

    fn gateway(providers: Vec<StaticProvider>) -> Arc<Gateway> {
        let config = GatewayConfig::builder().cache_enabled(false).build().unwrap();
        Arc::new(
            Gateway::builder()
                .config(config)
                .providers(providers.into_iter().map(|p| Arc::new(p) as Arc<dyn analyst_data::DataProvider>))
                .build()
                .unwrap(),
        )
    }

    fn planned(kinds: &[DataKind]) -> AnalysisState {
        let mut state = state("ABC");
        let tasks = kinds
            .iter()
            .enumerate()
            .map(|(i, kind)| ResearchTask::new(*kind, kind.as_str(), u8::try_from(i + 1).unwrap()))
            .collect();
        state.apply(StateDelta::Plan(tasks)).unwrap();
        state
    }

    #[tokio::test]
    async fn test_partial_failure_is_success() {
        let node = FetcherNode::new(gateway(vec![
            StaticProvider::ok("yahoo", &[DataKind::PriceHistory]),
            StaticProvider::failing("finnhub", &[DataKind::News], FetchError::RateLimited),
        ]));

        let delta = node
            .transform(&planned(&[DataKind::PriceHistory, DataKind::News]), &context())
            .await
            .unwrap();
        let StateDelta::RawData(entries) = delta else {
            panic!("expected raw data");
        };
        assert_eq!(entries.len(), 2);
        assert_eq!(entries.iter().filter(|(_, r)| r.is_ok()).count(), 1);
    }

    #[tokio::test]
    async fn test_all_failed_is_no_data() {
        let node = FetcherNode::new(gateway(vec![StaticProvider::failing(
            "yahoo",
            &[DataKind::PriceHistory],
            FetchError::provider("502"),
        )]));

        let fault = node
            .transform(&planned(&[DataKind::PriceHistory, DataKind::Filings]), &context())
            .await
            .unwrap_err();
        assert_eq!(fault.kind, FaultKind::NoData);
    }

    #[tokio::test]
    async fn test_cancelled_fetch_is_not_no_data() {
        let node = FetcherNode::new(gateway(vec![StaticProvider::ok(
            "yahoo",
            &[DataKind::PriceHistory],
        )]));
        let ctx = context();
        ctx.cancel.cancel();

        let delta = node
            .transform(&planned(&[DataKind::PriceHistory]), &ctx)
            .await
            .unwrap();
        assert_eq!(
            delta,
            StateDelta::RawData(vec![(
                analyst_core::SourceKey::new(DataKind::PriceHistory, "yahoo"),
                Err(FetchError::Cancelled)
            )])
        );
    }

    #[tokio::test]
    async fn test_missing_plan_is_internal() {
        let node = FetcherNode::new(gateway(vec![]));
        let fault = node.transform(&state("ABC"), &context()).await.unwrap_err();
        assert_eq!(fault.kind, FaultKind::Internal);
    }
}
