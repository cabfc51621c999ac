//! Writer node: drafts the research report from the analysis

use crate::config::AgentConfig;
use crate::llm::{prompt_fault, LlmClient};
use crate::parse::{labelled, sections};
use crate::prompts::{WRITER_SYSTEM, WRITER_USER};
use analyst_core::{
    AgentNode, AnalysisState, NodeContext, NodeFault, Recommendation, Report, ReportSection,
    Stage, StateDelta,
};
use analyst_llm::Prompt;
use async_trait::async_trait;
use chrono::Utc;
use minijinja::context;
use std::sync::Arc;
use tracing::{info, instrument};

pub struct WriterNode {
    llm: LlmClient,
    config: Arc<AgentConfig>,
}

impl WriterNode {
    pub fn new(llm: LlmClient, config: Arc<AgentConfig>) -> Self {
        Self { llm, config }
    }
}

#[async_trait]
impl AgentNode for WriterNode {
    fn stage(&self) -> Stage {
        Stage::Writer
    }

    #[instrument(skip_all, fields(ticker = %state.ticker(), iteration = ctx.iteration))]
    async fn transform(
        &self,
        state: &AnalysisState,
        ctx: &NodeContext,
    ) -> Result<StateDelta, NodeFault> {
        let Some(analysis) = state.analysis() else {
            return Err(NodeFault::internal(Stage::Writer, "no analysis to write up"));
        };
        let ticker = state.ticker();
        let market = ticker.market();
        let current_date = Utc::now().format("%B %d, %Y").to_string();

        let plan: Vec<&str> = state
            .plan()
            .unwrap_or_default()
            .iter()
            .map(|task| task.description.as_str())
            .collect();
        let missing: Vec<String> = analysis
            .missing_sources
            .iter()
            .map(ToString::to_string)
            .collect();
        let deficiencies: Vec<String> = state
            .quality()
            .map(|verdict| verdict.deficiencies.iter().map(ToString::to_string).collect())
            .unwrap_or_default();

        let system = WRITER_SYSTEM
            .render(context! { currency => market.currency(), current_date => &current_date })
            .map_err(|e| prompt_fault(Stage::Writer, e))?;
        let user = WRITER_USER
            .render(context! {
                company => ticker.canonical(),
                current_date => &current_date,
                market => market.label(),
                currency => market.currency(),
                plan => plan,
                analysis_summary => &analysis.summary,
                findings => &analysis.findings,
                missing => missing,
                deficiencies => deficiencies,
            })
            .map_err(|e| prompt_fault(Stage::Writer, e))?;
        let prompt = Prompt::new(system, user)
            .with_max_tokens(self.config.report_max_tokens)
            .with_temperature(self.config.temperature);

        let text = self.llm.ask(Stage::Writer, &prompt, ctx).await?;
        let report = parse_report(&ticker.canonical(), &text)
            .map_err(|e| NodeFault::malformed(Stage::Writer, e))?;

        info!(
            recommendation = %report.recommendation,
            sections = report.sections.len(),
            "Report drafted"
        );
        Ok(StateDelta::Report(report))
    }
}

/// Parse the writer's answer into a report
///
/// The recommendation line is required. A missing summary falls back to the
/// first section's text; a missing rationale stays empty for the checker to
/// flag.
pub fn parse_report(ticker: &str, text: &str) -> Result<Report, String> {
    let recommendation: Recommendation = labelled(text, "RECOMMENDATION")
        .ok_or_else(|| "report has no RECOMMENDATION line".to_string())?
        .parse()?;
    let rationale = labelled(text, "RATIONALE").unwrap_or_default().to_string();

    let (_, parsed) = sections(text);
    let sections: Vec<ReportSection> = parsed
        .into_iter()
        .map(|s| ReportSection {
            title: s.title,
            body: s.body,
        })
        .collect();

    let summary = match labelled(text, "SUMMARY") {
        Some(summary) if !summary.is_empty() => summary.to_string(),
        _ => sections.first().map(|s| s.body.clone()).unwrap_or_default(),
    };

    Ok(Report {
        ticker: ticker.to_string(),
        recommendation,
        rationale,
        summary,
        sections,
        generated_at: Utc::now(),
    })
}
