//! Checker node: scores the draft report and lists its deficiencies
//!
//! The final score is the model's score minus fixed penalties for structural
//! gaps the checker can detect without the model:
//!
//! | Rule                                        | Penalty | Category       |
//! |---------------------------------------------|---------|----------------|
//! | empty rationale                             | 2.0     | recommendation |
//! | no valuation section                        | 1.5     | analysis       |
//! | no risk section                             | 1.5     | analysis       |
//! | no financial health section                 | 1.0     | analysis       |
//! | no growth section                           | 1.0     | analysis       |
//! | report shorter than 500 characters          | 1.0     | presentation   |
//! | error or failure text outside limitations   | 1.0     | presentation   |
//! | no price, revenue, profit or growth figures | 1.0     | analysis       |
//! | failed sources not disclosed                | 1.0     | missing_data   |

use crate::completeness::{Completeness, RequiredSection};
use crate::config::AgentConfig;
use crate::llm::{prompt_fault, LlmClient};
use crate::parse::labelled;
use crate::prompts::{CHECKER_SYSTEM, CHECKER_USER};
use analyst_core::{
    AgentNode, AnalysisState, Deficiency, DeficiencyCategory, NodeContext, NodeFault,
    QualityScore, QualityVerdict, Report, Stage, StateDelta,
};
use analyst_llm::Prompt;
use async_trait::async_trait;
use minijinja::context;
use regex::Regex;
use std::fmt::Write as _;
use std::sync::{Arc, LazyLock};
use tracing::{debug, info, instrument};

/// Reports shorter than this are penalized
pub const MIN_REPORT_CHARS: usize = 500;

const DISCLOSURE_WORDS: [&str; 4] = ["unavailable", "missing", "not available", "limited"];

/// At least one of these should appear in any substantive report
const FINANCIAL_WORDS: [&str; 5] = ["price", "revenue", "profit", "growth", "valuation"];

/// Section penalties for missing required sections
const SECTION_PENALTIES: [(RequiredSection, f32, &str); 4] = [
    (RequiredSection::Valuation, 1.5, "report has no valuation section"),
    (RequiredSection::RiskFactors, 1.5, "report has no risk section"),
    (RequiredSection::FinancialHealth, 1.0, "report has no financial health section"),
    (RequiredSection::GrowthProspects, 1.0, "report has no growth section"),
];

static ERROR_TEXT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(error|errors|failed)\b")
        .unwrap_or_else(|e| unreachable!("invalid error text pattern: {e}"))
});

static DEFICIENCY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[(?P<section>[^\]]+)\]\s*\((?P<category>[^)]+)\)\s*(?P<detail>.*)$")
        .unwrap_or_else(|e| unreachable!("invalid deficiency pattern: {e}"))
});

pub struct CheckerNode {
    llm: LlmClient,
    config: Arc<AgentConfig>,
}

impl CheckerNode {
    pub fn new(llm: LlmClient, config: Arc<AgentConfig>) -> Self {
        Self { llm, config }
    }
}

#[async_trait]
impl AgentNode for CheckerNode {
    fn stage(&self) -> Stage {
        Stage::Checker
    }

    #[instrument(skip_all, fields(ticker = %state.ticker(), iteration = ctx.iteration))]
    async fn transform(
        &self,
        state: &AnalysisState,
        ctx: &NodeContext,
    ) -> Result<StateDelta, NodeFault> {
        let Some(report) = state.report() else {
            return Err(NodeFault::internal(Stage::Checker, "no report to check"));
        };

        let plan: Vec<&str> = state
            .plan()
            .unwrap_or_default()
            .iter()
            .map(|task| task.description.as_str())
            .collect();
        let system = CHECKER_SYSTEM
            .render(context! { threshold => ctx.quality_threshold })
            .map_err(|e| prompt_fault(Stage::Checker, e))?;
        let user = CHECKER_USER
            .render(context! {
                company => state.ticker().canonical(),
                report => draft_text(report),
                plan => plan,
            })
            .map_err(|e| prompt_fault(Stage::Checker, e))?;
        let prompt = Prompt::new(system, user)
            .with_max_tokens(self.config.checker_max_tokens)
            .with_temperature(0.0);

        let text = self.llm.ask(Stage::Checker, &prompt, ctx).await?;
        let model_score =
            parse_score(&text).map_err(|e| NodeFault::malformed(Stage::Checker, e))?;
        let mut deficiencies = parse_deficiencies(&text);

        let undisclosed = !state.failed_sources().is_empty() && !discloses_gaps(report);
        let (penalty, found) = rule_penalties(report, undisclosed);
        for deficiency in found {
            if !deficiencies.contains(&deficiency) {
                deficiencies.push(deficiency);
            }
        }

        let score = QualityScore::new(model_score - penalty);
        let verdict = QualityVerdict::evaluate(score, deficiencies, ctx.quality_threshold);
        info!(
            model_score,
            penalty,
            score = %verdict.score,
            passed = verdict.passed,
            deficiencies = verdict.deficiencies.len(),
            "Quality check completed"
        );
        Ok(StateDelta::Verdict(verdict))
    }
}

/// Render a report the way the checker reads it
pub fn draft_text(report: &Report) -> String {
    let mut text = format!(
        "RECOMMENDATION: {}\nRATIONALE: {}\nSUMMARY: {}\n",
        report.recommendation, report.rationale, report.summary
    );
    for section in &report.sections {
        let _ = write!(text, "\n## {}\n{}\n", section.title, section.body);
    }
    text
}

/// Read `QUALITY_SCORE: 7.5/10` style lines
pub fn parse_score(text: &str) -> Result<f32, String> {
    let value = labelled(text, "QUALITY_SCORE").ok_or("no QUALITY_SCORE line")?;
    let token = value
        .split_whitespace()
        .next()
        .and_then(|t| t.split('/').next())
        .unwrap_or_default();
    token
        .parse::<f32>()
        .ok()
        .filter(|score| score.is_finite())
        .ok_or_else(|| format!("invalid quality score: {value}"))
}

/// Collect `DEFICIENCY:` lines
///
/// Lines without the `[section] (category)` prefix are kept with a general
/// section; unknown categories count as analysis problems.
pub fn parse_deficiencies(text: &str) -> Vec<Deficiency> {
    text.lines()
        .filter_map(|line| labelled(line, "DEFICIENCY"))
        .filter(|value| !value.is_empty() && !value.eq_ignore_ascii_case("none"))
        .map(|value| match DEFICIENCY_RE.captures(value) {
            Some(caps) => {
                let category = caps["category"].parse().unwrap_or_else(|e| {
                    debug!(error = %e, "Treating unknown category as analysis");
                    DeficiencyCategory::Analysis
                });
                Deficiency::new(caps["section"].trim(), category, caps["detail"].trim())
            }
            None => Deficiency::new("General", DeficiencyCategory::Analysis, value),
        })
        .collect()
}

/// Whether the report tells the reader that some data was missing
fn discloses_gaps(report: &Report) -> bool {
    if report.section("limitation").is_some() {
        return true;
    }
    let text = draft_text(report).to_lowercase();
    DISCLOSURE_WORDS.iter().any(|word| text.contains(word))
}

/// Report prose outside limitation sections, where failures belong
fn body_text(report: &Report) -> String {
    let mut text = format!("{}\n{}\n", report.rationale, report.summary);
    for section in report
        .sections
        .iter()
        .filter(|s| !s.title.to_lowercase().contains("limitation"))
    {
        let _ = write!(text, "{}\n{}\n", section.title, section.body);
    }
    text
}

/// Structural penalties and the deficiencies behind them
pub fn rule_penalties(report: &Report, undisclosed_gaps: bool) -> (f32, Vec<Deficiency>) {
    let mut penalty = 0.0;
    let mut found = Vec::new();

    if report.rationale.trim().is_empty() {
        penalty += 2.0;
        found.push(Deficiency::new(
            "Recommendation",
            DeficiencyCategory::Recommendation,
            "recommendation has no rationale",
        ));
    }

    let completeness = Completeness::of_report(report);
    for (section, cost, detail) in SECTION_PENALTIES {
        if completeness.is_missing(section) {
            penalty += cost;
            found.push(Deficiency::new(
                section.title(),
                DeficiencyCategory::Analysis,
                detail,
            ));
        }
    }

    if report.text_len() < MIN_REPORT_CHARS {
        penalty += 1.0;
        found.push(Deficiency::new(
            "Report",
            DeficiencyCategory::Presentation,
            format!("report is shorter than {MIN_REPORT_CHARS} characters"),
        ));
    }

    let body = body_text(report);
    if let Some(m) = ERROR_TEXT_RE.find(&body) {
        penalty += 1.0;
        found.push(Deficiency::new(
            "Report",
            DeficiencyCategory::Presentation,
            format!("report text mentions \"{}\" outside a limitations section", m.as_str()),
        ));
    }

    let lower = draft_text(report).to_lowercase();
    if !FINANCIAL_WORDS.iter().any(|word| lower.contains(word)) {
        penalty += 1.0;
        found.push(Deficiency::new(
            "Report",
            DeficiencyCategory::Analysis,
            "report cites no price, revenue, profit or growth figures",
        ));
    }

    if undisclosed_gaps {
        penalty += 1.0;
        found.push(Deficiency::new(
            "Data Limitations",
            DeficiencyCategory::MissingData,
            "unavailable data sources are not disclosed",
        ));
    }

    (penalty, found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{context as node_ctx, full_report, scripted, section, state};
    use analyst_core::{DataKind, FaultKind, FetchError, SourceKey};

    fn node(reply: &str) -> CheckerNode {
        CheckerNode::new(
            LlmClient::new(Arc::new(scripted(vec![reply])), "m"),
            Arc::new(AgentConfig::default()),
        )
    }

    fn reported(report: Report) -> AnalysisState {
        let mut state = state("ABC");
        state.apply(StateDelta::Report(report)).unwrap();
        state
    }

    #[test]
    fn test_parse_score() {
        assert_eq!(parse_score("QUALITY_SCORE: 7.5/10"), Ok(7.5));
        assert_eq!(parse_score("**QUALITY_SCORE:** 8 out of 10"), Ok(8.0));
        assert!(parse_score("QUALITY_SCORE: high").is_err());
        assert!(parse_score("Score: 9").is_err());
    }

    #[test]
    fn test_parse_deficiencies() {
        let text = "QUALITY_SCORE: 6\nDEFICIENCY: [Valuation] (analysis) no peer multiples\n- DEFICIENCY: [Summary] (tone) too promotional\nDEFICIENCY: cite sources\nDEFICIENCY: none";
        let found = parse_deficiencies(text);

        assert_eq!(found.len(), 3);
        assert_eq!(
            found[0],
            Deficiency::new("Valuation", DeficiencyCategory::Analysis, "no peer multiples")
        );
        assert_eq!(found[1].category, DeficiencyCategory::Analysis);
        assert_eq!(found[2].section, "General");
    }

    #[test]
    fn test_rule_penalties() {
        let (penalty, found) = rule_penalties(&full_report(), false);
        assert_eq!(penalty, 0.0);
        assert!(found.is_empty());

        let mut bare = full_report();
        bare.rationale.clear();
        bare.sections = vec![section("Executive Summary", "Short.")];
        let (penalty, found) = rule_penalties(&bare, true);
        assert!((penalty - 10.0).abs() < f32::EPSILON);
        assert_eq!(found.len(), 8);
        assert!(found
            .iter()
            .any(|d| d.category == DeficiencyCategory::Presentation));
    }

    #[test]
    fn test_missing_growth_and_financial_sections() {
        let mut report = full_report();
        report
            .sections
            .retain(|s| s.title != "Financial Health" && s.title != "Growth Prospects");
        let (penalty, found) = rule_penalties(&report, false);

        assert!((penalty - 2.0).abs() < f32::EPSILON);
        let sections: Vec<_> = found.iter().map(|d| d.section.as_str()).collect();
        assert_eq!(sections, vec!["Financial Health", "Growth Prospects"]);
    }

    #[test]
    fn test_error_text_penalized_outside_limitations() {
        let mut report = full_report();
        report
            .sections
            .push(section("Data Limitations", "The filings request failed."));
        assert_eq!(rule_penalties(&report, false).0, 0.0);

        report.summary.push_str(" Error: data fetch failed.");
        let (penalty, found) = rule_penalties(&report, false);
        assert_eq!(penalty, 1.0);
        assert_eq!(found[0].category, DeficiencyCategory::Presentation);
        assert!(found[0].detail.contains("Error"));
    }

    #[test]
    fn test_disclosure_detection() {
        assert!(discloses_gaps(&full_report()));

        let mut report = full_report();
        report.sections.retain(|s| s.title != "Data Limitations");
        assert!(!discloses_gaps(&report));

        report.summary.push_str(" News data was not available.");
        assert!(discloses_gaps(&report));
    }

    #[tokio::test]
    async fn test_passing_verdict() {
        let delta = node("QUALITY_SCORE: 8.5/10")
            .transform(&reported(full_report()), &node_ctx())
            .await
            .unwrap();
        let StateDelta::Verdict(verdict) = delta else {
            panic!("expected verdict");
        };
        assert!(verdict.passed);
        assert_eq!(verdict.score.value(), 8.5);
        assert!(verdict.deficiencies.is_empty());
    }

    #[tokio::test]
    async fn test_penalty_fails_report() {
        let mut report = full_report();
        report.sections.retain(|s| s.title != "Data Limitations");
        let mut state = reported(report);
        state.record_fetch(
            SourceKey::new(DataKind::News, "finnhub"),
            Err(FetchError::RateLimited),
            false,
        );

        let delta = node("QUALITY_SCORE: 7.5\nDEFICIENCY: [Valuation] (analysis) thin")
            .transform(&state, &node_ctx())
            .await
            .unwrap();
        let StateDelta::Verdict(verdict) = delta else {
            panic!("expected verdict");
        };
        assert!(!verdict.passed);
        assert_eq!(verdict.score.value(), 6.5);
        assert_eq!(verdict.deficiencies.len(), 2);
        assert_eq!(
            verdict.deficiencies[1].category,
            DeficiencyCategory::MissingData
        );
    }

    #[tokio::test]
    async fn test_score_is_clamped() {
        let mut report = full_report();
        report.rationale.clear();
        report.sections.clear();
        let delta = node("QUALITY_SCORE: 1/10")
            .transform(&reported(report), &node_ctx())
            .await
            .unwrap();
        let StateDelta::Verdict(verdict) = delta else {
            panic!("expected verdict");
        };
        assert_eq!(verdict.score.value(), QualityScore::MIN);
    }

    #[tokio::test]
    async fn test_missing_score_is_malformed() {
        let fault = node("Looks good overall.")
            .transform(&reported(full_report()), &node_ctx())
            .await
            .unwrap_err();
        assert_eq!(fault.kind, FaultKind::MalformedResponse);
    }
}
