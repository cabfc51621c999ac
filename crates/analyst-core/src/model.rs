//! Domain records produced by the agent nodes

use crate::error::{FaultKind, FetchError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Category of data the planner can request
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataKind {
    /// Daily price history and current quote
    PriceHistory,
    /// Company overview and valuation metrics
    Fundamentals,
    /// Periodic earnings reports
    Earnings,
    /// Regulatory filings
    Filings,
    /// Recent news coverage
    News,
}

impl DataKind {
    pub const ALL: [DataKind; 5] = [
        DataKind::PriceHistory,
        DataKind::Fundamentals,
        DataKind::Earnings,
        DataKind::Filings,
        DataKind::News,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DataKind::PriceHistory => "price_history",
            DataKind::Fundamentals => "fundamentals",
            DataKind::Earnings => "earnings",
            DataKind::Filings => "filings",
            DataKind::News => "news",
        }
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One named data request in the research plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchTask {
    pub kind: DataKind,
    pub description: String,
    /// Lower runs first
    pub priority: u8,
}

impl ResearchTask {
    pub fn new(kind: DataKind, description: impl Into<String>, priority: u8) -> Self {
        Self {
            kind,
            description: description.into(),
            priority,
        }
    }
}

/// Identifies one raw data entry: which kind, from which provider
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourceKey {
    pub kind: DataKind,
    pub provider: String,
}

impl SourceKey {
    pub fn new(kind: DataKind, provider: impl Into<String>) -> Self {
        Self {
            kind,
            provider: provider.into(),
        }
    }
}

impl fmt::Display for SourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.provider)
    }
}

/// Successful provider response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    pub provider: String,
    pub kind: DataKind,
    /// Provider data, normalized to JSON
    pub body: serde_json::Value,
    /// Short human readable digest for prompts
    pub summary: String,
    pub retrieved_at: DateTime<Utc>,
}

impl Payload {
    pub fn new(
        provider: impl Into<String>,
        kind: DataKind,
        body: serde_json::Value,
        summary: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            kind,
            body,
            summary: summary.into(),
            retrieved_at: Utc::now(),
        }
    }

    pub fn key(&self) -> SourceKey {
        SourceKey::new(self.kind, self.provider.clone())
    }
}

/// A raw data entry as stored in the analysis state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchRecord {
    pub outcome: Result<Payload, FetchError>,
    /// Iteration during which the entry was written
    pub iteration: u32,
    pub recorded_at: DateTime<Utc>,
}

impl FetchRecord {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// One titled block of analyst output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub heading: String,
    pub body: String,
}

/// Structured findings of one analyst pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub summary: String,
    pub findings: Vec<Finding>,
    /// Sources that failed and were reported to the analyst as missing
    pub missing_sources: Vec<SourceKey>,
    /// Deficiency details the analyst was asked to address
    pub addressed_deficiencies: Vec<String>,
    pub produced_at: DateTime<Utc>,
}

/// Fixed recommendation vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recommendation {
    Buy,
    Hold,
    Sell,
}

impl Recommendation {
    pub fn as_str(self) -> &'static str {
        match self {
            Recommendation::Buy => "BUY",
            Recommendation::Hold => "HOLD",
            Recommendation::Sell => "SELL",
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Recommendation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_matches(|c: char| c == '*' || c == '.').to_ascii_uppercase().as_str() {
            "BUY" | "STRONG BUY" => Ok(Recommendation::Buy),
            "HOLD" | "NEUTRAL" => Ok(Recommendation::Hold),
            "SELL" | "STRONG SELL" => Ok(Recommendation::Sell),
            other => Err(format!("unknown recommendation: {other}")),
        }
    }
}

/// A titled report section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSection {
    pub title: String,
    pub body: String,
}

/// Draft produced by the writer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub ticker: String,
    pub recommendation: Recommendation,
    pub rationale: String,
    pub summary: String,
    pub sections: Vec<ReportSection>,
    pub generated_at: DateTime<Utc>,
}

impl Report {
    /// Find a section by case-insensitive title substring
    pub fn section(&self, needle: &str) -> Option<&ReportSection> {
        let needle = needle.to_lowercase();
        self.sections
            .iter()
            .find(|s| s.title.to_lowercase().contains(&needle))
    }

    /// Total character count of all prose in the report
    pub fn text_len(&self) -> usize {
        self.summary.len()
            + self.rationale.len()
            + self
                .sections
                .iter()
                .map(|s| s.title.len() + s.body.len())
                .sum::<usize>()
    }
}

/// Quality score on a fixed 0-10 scale
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QualityScore(f32);

impl QualityScore {
    pub const MIN: f32 = 0.0;
    pub const MAX: f32 = 10.0;

    /// Create a score, clamped into range (NaN becomes the minimum)
    pub fn new(value: f32) -> Self {
        if value.is_nan() {
            return Self(Self::MIN);
        }
        Self(value.clamp(Self::MIN, Self::MAX))
    }

    pub fn value(self) -> f32 {
        self.0
    }
}

impl fmt::Display for QualityScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}/10", self.0)
    }
}

/// What a deficiency is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeficiencyCategory {
    /// Data that was not available or not disclosed
    MissingData,
    /// Reasoning or metrics in the analysis
    Analysis,
    /// Recommendation or its justification
    Recommendation,
    /// Structure, wording, or formatting of the report only
    Presentation,
}

impl DeficiencyCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            DeficiencyCategory::MissingData => "missing_data",
            DeficiencyCategory::Analysis => "analysis",
            DeficiencyCategory::Recommendation => "recommendation",
            DeficiencyCategory::Presentation => "presentation",
        }
    }
}

impl FromStr for DeficiencyCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace([' ', '-'], "_").as_str() {
            "missing_data" | "data" => Ok(DeficiencyCategory::MissingData),
            "analysis" => Ok(DeficiencyCategory::Analysis),
            "recommendation" => Ok(DeficiencyCategory::Recommendation),
            "presentation" | "format" | "formatting" => Ok(DeficiencyCategory::Presentation),
            other => Err(format!("unknown deficiency category: {other}")),
        }
    }
}

/// A concrete problem found by the checker, tied to a report section
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Deficiency {
    pub section: String,
    pub category: DeficiencyCategory,
    pub detail: String,
}

impl Deficiency {
    pub fn new(
        section: impl Into<String>,
        category: DeficiencyCategory,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            section: section.into(),
            category,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for Deficiency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] ({}) {}", self.section, self.category.as_str(), self.detail)
    }
}

/// Checker verdict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityVerdict {
    pub score: QualityScore,
    pub deficiencies: Vec<Deficiency>,
    pub passed: bool,
}

impl QualityVerdict {
    /// Build a verdict, deriving `passed` from the threshold
    pub fn evaluate(score: QualityScore, deficiencies: Vec<Deficiency>, threshold: f32) -> Self {
        Self {
            passed: score.value() >= threshold,
            score,
            deficiencies,
        }
    }

    /// True if every deficiency only concerns presentation
    pub fn presentation_only(&self) -> bool {
        !self.deficiencies.is_empty()
            && self
                .deficiencies
                .iter()
                .all(|d| d.category == DeficiencyCategory::Presentation)
    }
}

/// Why a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "fault", rename_all = "snake_case")]
pub enum TerminalReason {
    /// The checker accepted the report
    QualityPassed,
    /// The iteration budget ran out before a passing verdict
    MaxIterationsReached,
    /// The wall-clock budget ran out after a report existed
    ///
    /// Not fatal: the run still hands back its last checked report. Hosts
    /// should treat it like [`MaxIterationsReached`](Self::MaxIterationsReached),
    /// a best-effort result that did not pass review.
    TimedOut,
    /// An unrecoverable fault ended the run
    FatalError(FaultKind),
}

impl TerminalReason {
    pub fn is_fatal(self) -> bool {
        matches!(self, TerminalReason::FatalError(_))
    }
}

impl fmt::Display for TerminalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminalReason::QualityPassed => f.write_str("quality-passed"),
            TerminalReason::MaxIterationsReached => f.write_str("max-iterations-reached"),
            TerminalReason::TimedOut => f.write_str("timed-out"),
            TerminalReason::FatalError(kind) => write!(f, "fatal-error ({kind})"),
        }
    }
}
