//! Analyst node: turns raw data into structured findings

use crate::completeness::Completeness;
use crate::config::AgentConfig;
use crate::llm::{prompt_fault, LlmClient};
use crate::parse::sections;
use crate::prompts::{ANALYST_SYSTEM, ANALYST_USER};
use analyst_core::{
    AgentNode, Analysis, AnalysisState, Finding, NodeContext, NodeFault, Stage, StateDelta,
};
use analyst_data::DataCoverage;
use analyst_llm::Prompt;
use async_trait::async_trait;
use chrono::Utc;
use minijinja::context;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};

pub struct AnalystNode {
    llm: LlmClient,
    config: Arc<AgentConfig>,
}

#[derive(Serialize)]
struct SourceLine {
    key: String,
    summary: String,
}

#[derive(Serialize)]
struct MissingLine {
    key: String,
    reason: String,
}

impl AnalystNode {
    pub fn new(llm: LlmClient, config: Arc<AgentConfig>) -> Self {
        Self { llm, config }
    }

    fn prompt(&self, state: &AnalysisState, deficiencies: &[String]) -> Result<Prompt, NodeFault> {
        let ticker = state.ticker();
        let market = ticker.market();
        let current_date = Utc::now().format("%B %d, %Y").to_string();

        let sources: Vec<SourceLine> = state
            .payloads()
            .map(|(key, payload)| SourceLine {
                key: key.to_string(),
                summary: clip(&payload.summary, self.config.summary_chars),
            })
            .collect();
        let missing: Vec<MissingLine> = state
            .failed_sources()
            .into_iter()
            .map(|(key, error)| MissingLine {
                key: key.to_string(),
                reason: error.to_string(),
            })
            .collect();
        let coverage = DataCoverage::assess(state.payloads().map(|(_, payload)| payload));

        let system = ANALYST_SYSTEM
            .render(context! { currency => market.currency(), current_date => &current_date })
            .map_err(|e| prompt_fault(Stage::Analyst, e))?;
        let user = ANALYST_USER
            .render(context! {
                company => ticker.canonical(),
                current_date => &current_date,
                market => market.label(),
                currency => market.currency(),
                sources => sources,
                missing => missing,
                coverage => coverage.to_string(),
                deficiencies => deficiencies,
            })
            .map_err(|e| prompt_fault(Stage::Analyst, e))?;

        Ok(Prompt::new(system, user)
            .with_max_tokens(self.config.analysis_max_tokens)
            .with_temperature(self.config.temperature))
    }
}

#[async_trait]
impl AgentNode for AnalystNode {
    fn stage(&self) -> Stage {
        Stage::Analyst
    }

    #[instrument(skip_all, fields(ticker = %state.ticker(), iteration = ctx.iteration))]
    async fn transform(
        &self,
        state: &AnalysisState,
        ctx: &NodeContext,
    ) -> Result<StateDelta, NodeFault> {
        let deficiencies: Vec<String> = state
            .quality()
            .map(|verdict| verdict.deficiencies.iter().map(ToString::to_string).collect())
            .unwrap_or_default();

        let prompt = self.prompt(state, &deficiencies)?;
        let text = self.llm.ask(Stage::Analyst, &prompt, ctx).await?;

        let (summary, parsed) = sections(&text);
        if parsed.is_empty() {
            return Err(NodeFault::malformed(
                Stage::Analyst,
                "analysis has no sections",
            ));
        }

        let findings: Vec<Finding> = parsed
            .into_iter()
            .map(|s| Finding {
                heading: s.title,
                body: s.body,
            })
            .collect();

        let analysis = Analysis {
            summary,
            findings,
            missing_sources: state
                .failed_sources()
                .into_iter()
                .map(|(key, _)| key.clone())
                .collect(),
            addressed_deficiencies: deficiencies,
            produced_at: Utc::now(),
        };

        let completeness = Completeness::of_analysis(&analysis);
        info!(
            findings = analysis.findings.len(),
            completeness = completeness.score(),
            "Analysis completed"
        );
        if !completeness.is_complete() {
            warn!(missing = ?completeness.missing_titles(), "Analysis skips required sections");
        }
        Ok(StateDelta::Analysis(analysis))
    }
}

fn clip(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{context as node_ctx, payload, routed, scripted, state, user_text};
    use analyst_core::{
        DataKind, Deficiency, DeficiencyCategory, FaultKind, FetchError, QualityScore,
        QualityVerdict, SourceKey,
    };

    const ANALYSIS: &str = "Solid franchise.\n\n## Financial Health\nNet cash.\n\n## Valuation\n18x earnings.";

    fn node(provider: crate::testing::MockProvider, summary_chars: usize) -> AnalystNode {
        let config = AgentConfig::builder().summary_chars(summary_chars).build().unwrap();
        AnalystNode::new(LlmClient::new(Arc::new(provider), "m"), Arc::new(config))
    }

    fn fetched() -> AnalysisState {
        let mut state = state("ABC");
        state.record_fetch(
            SourceKey::new(DataKind::PriceHistory, "yahoo"),
            Ok(payload(DataKind::PriceHistory, "yahoo", "close 10.00 up 5% over 90 days")),
            false,
        );
        state.record_fetch(
            SourceKey::new(DataKind::News, "finnhub"),
            Err(FetchError::RateLimited),
            false,
        );
        state
    }

    #[tokio::test]
    async fn test_findings_and_missing_sources() {
        let delta = node(scripted(vec![ANALYSIS]), 500)
            .transform(&fetched(), &node_ctx())
            .await
            .unwrap();
        let StateDelta::Analysis(analysis) = delta else {
            panic!("expected analysis");
        };

        assert_eq!(analysis.summary, "Solid franchise.");
        assert_eq!(analysis.findings.len(), 2);
        assert_eq!(analysis.findings[1].heading, "Valuation");
        assert_eq!(
            analysis.missing_sources,
            vec![SourceKey::new(DataKind::News, "finnhub")]
        );
        assert!(analysis.addressed_deficiencies.is_empty());
    }

    #[tokio::test]
    async fn test_prompt_carries_data_and_deficiencies() {
        let provider = routed(|request| {
            let user = user_text(request);
            assert!(user.contains("- [price_history/yahoo] close 10.00..."));
            assert!(user.contains("- [news/finnhub] rate limit exceeded"));
            assert!(user.contains("[Valuation] (analysis) no peer multiples"));
            assert!(user.contains("CURRENCY: USD"));
            assert!(user.contains("DATA COVERAGE: poor (0/100)"));
            ANALYSIS.to_string()
        });

        let mut state = fetched();
        state
            .apply(StateDelta::Verdict(QualityVerdict::evaluate(
                QualityScore::new(5.0),
                vec![Deficiency::new(
                    "Valuation",
                    DeficiencyCategory::Analysis,
                    "no peer multiples",
                )],
                7.0,
            )))
            .unwrap();

        let delta = node(provider, 11).transform(&state, &node_ctx()).await.unwrap();
        let StateDelta::Analysis(analysis) = delta else {
            panic!("expected analysis");
        };
        assert_eq!(
            analysis.addressed_deficiencies,
            vec!["[Valuation] (analysis) no peer multiples".to_string()]
        );
    }

    #[tokio::test]
    async fn test_unstructured_answer_is_malformed() {
        let fault = node(scripted(vec!["Looks fine to me."]), 500)
            .transform(&fetched(), &node_ctx())
            .await
            .unwrap_err();
        assert_eq!(fault.kind, FaultKind::MalformedResponse);
    }

    #[test]
    fn test_clip() {
        assert_eq!(clip("abcdef", 3), "abc...");
        assert_eq!(clip("abc", 3), "abc");
    }
}
