//! The research report handed back to callers

use analyst_core::{
    AnalysisState, Deficiency, QualityScore, Recommendation, ReportSection, SourceKey,
    TerminalReason,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

pub const DISCLAIMER: &str = "Disclaimer: This analysis is generated by an AI system for educational purposes. Please consult with qualified financial advisors before making investment decisions.";

/// Which sources fed the report and which failed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub succeeded: Vec<SourceKey>,
    /// Failed sources with the recorded reason
    pub failed: Vec<(SourceKey, String)>,
}

impl Provenance {
    pub fn from_state(state: &AnalysisState) -> Self {
        Self {
            succeeded: state.succeeded_sources().into_iter().cloned().collect(),
            failed: state
                .failed_sources()
                .into_iter()
                .map(|(key, error)| (key.clone(), error.to_string()))
                .collect(),
        }
    }
}

/// Final report of a research run, with its quality record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchReport {
    pub ticker: String,
    pub recommendation: Recommendation,
    pub rationale: String,
    pub summary: String,
    pub sections: Vec<ReportSection>,
    pub generated_at: DateTime<Utc>,
    /// Score of the last checker pass, if one completed
    pub quality_score: Option<QualityScore>,
    pub deficiencies: Vec<Deficiency>,
    /// Checked drafts, counting the first
    pub iterations: u32,
    pub terminal_reason: TerminalReason,
    pub provenance: Provenance,
}

impl ResearchReport {
    /// Build from a finished state; `None` if no report was drafted
    pub fn from_state(state: &AnalysisState, reason: TerminalReason) -> Option<Self> {
        let report = state.report()?;
        let quality = state.quality();

        Some(Self {
            ticker: report.ticker.clone(),
            recommendation: report.recommendation,
            rationale: report.rationale.clone(),
            summary: report.summary.clone(),
            sections: report.sections.clone(),
            generated_at: report.generated_at,
            quality_score: quality.map(|q| q.score),
            deficiencies: quality.map(|q| q.deficiencies.clone()).unwrap_or_default(),
            iterations: state.checker_passes().max(1),
            terminal_reason: reason,
            provenance: Provenance::from_state(state),
        })
    }

    /// Whether the checker accepted the report
    pub fn passed(&self) -> bool {
        self.terminal_reason == TerminalReason::QualityPassed
    }

    pub fn to_markdown(&self) -> String {
        let mut out = format!("# Investment Research Report: {}\n\n", self.ticker);
        let _ = writeln!(out, "**Recommendation:** {}\n", self.recommendation);
        if !self.rationale.is_empty() {
            let _ = writeln!(out, "**Rationale:** {}\n", self.rationale);
        }
        if !self.summary.is_empty() {
            let _ = writeln!(out, "{}\n", self.summary);
        }

        for section in &self.sections {
            let _ = writeln!(out, "## {}\n\n{}\n", section.title, section.body);
        }

        out.push_str("---\n\n");
        let score = self
            .quality_score
            .map_or_else(|| "not scored".to_string(), |s| s.to_string());
        let _ = writeln!(
            out,
            "Quality: {score} | Iterations: {} | Outcome: {}",
            self.iterations, self.terminal_reason
        );
        if !self.deficiencies.is_empty() {
            out.push_str("\nOpen issues:\n");
            for deficiency in &self.deficiencies {
                let _ = writeln!(out, "- {deficiency}");
            }
        }
        let _ = writeln!(out, "\nGenerated: {}", self.generated_at.format("%Y-%m-%d %H:%M UTC"));
        let _ = writeln!(out, "\n{DISCLAIMER}");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{full_report, payload, state};
    use analyst_core::{
        DataKind, DeficiencyCategory, FetchError, QualityVerdict, StateDelta,
    };

    fn failing_verdict() -> StateDelta {
        StateDelta::Verdict(QualityVerdict::evaluate(
            QualityScore::new(6.0),
            vec![Deficiency::new(
                "Valuation",
                DeficiencyCategory::Analysis,
                "no peers",
            )],
            7.0,
        ))
    }

    /// Two drafts, both checked
    fn finished() -> AnalysisState {
        let mut state = state("ABC");
        state.record_fetch(
            SourceKey::new(DataKind::PriceHistory, "yahoo"),
            Ok(payload(DataKind::PriceHistory, "yahoo", "prices")),
            false,
        );
        state.record_fetch(
            SourceKey::new(DataKind::News, "finnhub"),
            Err(FetchError::RateLimited),
            false,
        );
        state.apply(StateDelta::Report(full_report())).unwrap();
        state.apply(failing_verdict()).unwrap();
        state.advance_iteration().unwrap();
        state.apply(StateDelta::Report(full_report())).unwrap();
        state.apply(failing_verdict()).unwrap();
        state
    }

    #[test]
    fn test_from_state() {
        let report =
            ResearchReport::from_state(&finished(), TerminalReason::MaxIterationsReached).unwrap();

        assert_eq!(report.iterations, 2);
        assert_eq!(report.quality_score, Some(QualityScore::new(6.0)));
        assert_eq!(report.deficiencies.len(), 1);
        assert!(!report.passed());
        assert_eq!(
            report.provenance.succeeded,
            vec![SourceKey::new(DataKind::PriceHistory, "yahoo")]
        );
        assert_eq!(
            report.provenance.failed,
            vec![(
                SourceKey::new(DataKind::News, "finnhub"),
                "rate limit exceeded".to_string()
            )]
        );
    }

    #[test]
    fn test_unchecked_revision_not_counted() {
        let mut state = state("ABC");
        state.apply(StateDelta::Report(full_report())).unwrap();
        state.apply(failing_verdict()).unwrap();
        state.advance_iteration().unwrap();

        let report = ResearchReport::from_state(&state, TerminalReason::TimedOut).unwrap();
        assert_eq!(report.iterations, 1);
    }

    #[test]
    fn test_no_report_no_result() {
        assert!(ResearchReport::from_state(&state("ABC"), TerminalReason::TimedOut).is_none());
    }

    #[test]
    fn test_markdown() {
        let report =
            ResearchReport::from_state(&finished(), TerminalReason::MaxIterationsReached).unwrap();
        let markdown = report.to_markdown();

        assert!(markdown.starts_with("# Investment Research Report: ABC"));
        assert!(markdown.contains("**Recommendation:** BUY"));
        assert!(markdown.contains("## Valuation\n\nTrades at 18x forward earnings."));
        assert!(markdown.contains("Quality: 6.0/10 | Iterations: 2 | Outcome: max-iterations-reached"));
        assert!(markdown.contains("- [Valuation] (analysis) no peers"));
        assert!(markdown.trim_end().ends_with(DISCLAIMER));
    }

    #[test]
    fn test_serializes_to_json() {
        let report = ResearchReport::from_state(&finished(), TerminalReason::QualityPassed).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["recommendation"], "buy");
        assert_eq!(json["terminal_reason"]["reason"], "quality_passed");
        assert_eq!(json["quality_score"], 6.0);
    }
}
