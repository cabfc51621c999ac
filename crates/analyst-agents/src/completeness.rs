//! Section coverage of an analysis or report
//!
//! A complete piece covers financial health, growth prospects, valuation,
//! risk factors and a recommendation. Coverage is judged by section
//! headings, falling back to the prose for analyses.

use analyst_core::{Analysis, Report};
use serde::Serialize;

/// A section every complete analysis covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequiredSection {
    FinancialHealth,
    GrowthProspects,
    Valuation,
    RiskFactors,
    Recommendation,
}

impl RequiredSection {
    pub const ALL: [RequiredSection; 5] = [
        RequiredSection::FinancialHealth,
        RequiredSection::GrowthProspects,
        RequiredSection::Valuation,
        RequiredSection::RiskFactors,
        RequiredSection::Recommendation,
    ];

    pub fn title(self) -> &'static str {
        match self {
            RequiredSection::FinancialHealth => "Financial Health",
            RequiredSection::GrowthProspects => "Growth Prospects",
            RequiredSection::Valuation => "Valuation",
            RequiredSection::RiskFactors => "Risk Factors",
            RequiredSection::Recommendation => "Recommendation",
        }
    }

    /// Lowercase heading fragment that marks the section
    fn keyword(self) -> &'static str {
        match self {
            // Matches "Financial Health" and "Financial Analysis"
            RequiredSection::FinancialHealth => "financial",
            RequiredSection::GrowthProspects => "growth",
            RequiredSection::Valuation => "valuation",
            RequiredSection::RiskFactors => "risk",
            RequiredSection::Recommendation => "recommendation",
        }
    }
}

/// Found and missing required sections
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Completeness {
    pub found: Vec<RequiredSection>,
    pub missing: Vec<RequiredSection>,
}

impl Completeness {
    fn from_check(covered: impl Fn(RequiredSection) -> bool) -> Self {
        let (found, missing) = RequiredSection::ALL.into_iter().partition(|s| covered(*s));
        Self { found, missing }
    }

    /// Coverage of an analysis, by finding headings or the prose itself
    pub fn of_analysis(analysis: &Analysis) -> Self {
        let headings: Vec<String> = analysis
            .findings
            .iter()
            .map(|f| f.heading.to_lowercase())
            .collect();
        let prose = analysis.summary.to_lowercase();

        Self::from_check(|section| {
            let phrase = section.title().to_lowercase();
            headings.iter().any(|h| h.contains(section.keyword())) || prose.contains(&phrase)
        })
    }

    /// Coverage of a report; its recommendation line always counts
    pub fn of_report(report: &Report) -> Self {
        Self::from_check(|section| {
            section == RequiredSection::Recommendation || report.section(section.keyword()).is_some()
        })
    }

    /// Share of required sections covered, 0-100
    pub fn score(&self) -> f32 {
        self.found.len() as f32 / RequiredSection::ALL.len() as f32 * 100.0
    }

    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }

    pub fn is_missing(&self, section: RequiredSection) -> bool {
        self.missing.contains(&section)
    }

    pub fn missing_titles(&self) -> Vec<&'static str> {
        self.missing.iter().map(|s| s.title()).collect()
    }
}
